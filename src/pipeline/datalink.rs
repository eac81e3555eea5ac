use std::path::Path;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::addresses::{DataAddress, DataAddressMap};
use crate::errors::{StimError, StimResult};
use crate::library::{signature, Library, LibraryEntry, OUTPUT_BLOB, WEIGHT_BLOB};
use crate::network::NetworkLayer;
use crate::pipeline::boundary::SEPARATOR_RUN;
use crate::stream::{read_words, LineBuffer};
use crate::word::Word;

/// Stage 3: appends the data region (generated network input, then per
/// layer the weight and output blocks) after the control+task stream and
/// records every sub-task's data addresses in the sidecar map.
///
/// The first layer's input is freshly generated random data; every later
/// layer reads the previous layer's output block, so all sub-tasks of a
/// layer share one input pointer.
#[tracing::instrument(skip_all)]
pub fn link_data<R: Rng>(
    control_in: &Path,
    network: &[NetworkLayer],
    data_library: &Library,
    full_out: &Path,
    sidecar_out: &Path,
    rng: &mut R,
) -> StimResult<DataAddressMap> {
    let mut stream = LineBuffer::read_from(control_in)?;
    stream.push_sentinels(SEPARATOR_RUN);

    let first_layer = network.first().ok_or(StimError::EmptyNetwork)?;
    let input_lines = first_layer.input_lines();
    let input_addr = stream.len();
    for _ in 0..input_lines {
        stream.push(Word::random(rng));
    }
    stream.push_sentinels(SEPARATOR_RUN);
    info!(lines = input_lines, addr = input_addr, "generated network input block");

    let mut map = DataAddressMap::new();
    let mut prev_output = input_addr;
    let mut task_counter = 0usize;

    for (li, layer) in network.iter().enumerate() {
        let layer_idx = li + 1;
        let count = layer.subtask_count();
        info!(layer = layer_idx, operator = layer.operator(), input_addr = prev_output, "linking layer data");

        let mut entries: Vec<&LibraryEntry> = Vec::with_capacity(count);
        for k in 0..count {
            let width = layer.slice_width(k);
            let entry = data_library.find(layer, width).ok_or_else(|| StimError::LibraryMiss {
                layer: layer_idx,
                task: k + 1,
                signature: signature(layer, width),
            })?;
            entries.push(entry);
        }

        // weight block: the concatenation of every sub-task's weight blob.
        // Declared line counts drive the per-task offsets even when a file
        // disagrees with its own declaration.
        let mut weight_addrs = vec![0usize; count];
        if layer.has_weights() {
            let mut offset = stream.len();
            for (k, entry) in entries.iter().enumerate() {
                let lines = read_words(&entry.blob_path(WEIGHT_BLOB))?;
                if lines.len() != entry.info.weight_data {
                    warn!(
                        layer = layer_idx,
                        task = k + 1,
                        actual = lines.len(),
                        declared = entry.info.weight_data,
                        "weight blob line count disagrees with info.json"
                    );
                }
                weight_addrs[k] = offset;
                offset += entry.info.weight_data;
                stream.extend(lines);
            }
            stream.push_sentinels(SEPARATOR_RUN);
        }

        // output block, same layout rules
        let mut output_addrs = vec![0usize; count];
        let mut offset = stream.len();
        for (k, entry) in entries.iter().enumerate() {
            let lines = read_words(&entry.blob_path(OUTPUT_BLOB))?;
            if lines.len() != entry.info.output_data {
                warn!(
                    layer = layer_idx,
                    task = k + 1,
                    actual = lines.len(),
                    declared = entry.info.output_data,
                    "output blob line count disagrees with info.json"
                );
            }
            output_addrs[k] = offset;
            offset += entry.info.output_data;
            stream.extend(lines);
        }
        stream.push_sentinels(SEPARATOR_RUN);

        for (k, entry) in entries.iter().enumerate() {
            let record = DataAddress {
                input_data_addr: prev_output,
                weight_data_addr: if layer.has_weights() { weight_addrs[k] } else { 0 },
                output_data_addr: output_addrs[k],
                weight_lines: if layer.has_weights() { entry.info.weight_data } else { 0 },
                output_lines: entry.info.output_data,
            };
            debug!(
                layer = layer_idx,
                task = task_counter + k + 1,
                operator = layer.operator(),
                weight_addr = record.weight_data_addr,
                output_addr = record.output_data_addr,
                "data block linked"
            );
            map.insert(layer_idx, task_counter + k + 1, record);
        }

        prev_output = output_addrs[0];
        task_counter += count;
    }

    stream.write_to(full_out)?;
    map.save(sidecar_out)?;
    Ok(map)
}
