use std::path::Path;

use tracing::{debug, warn};

use crate::addresses::{DataAddress, DataAddressMap, TaskAddressMap};
use crate::errors::StimResult;
use crate::stream::LineBuffer;
use crate::word::{encode_bits, Word};

/// A storage-controller configuration is three consecutive lines whose
/// first line starts with this prefix.
pub const CONFIG_PREFIX: &str = "011";
/// Conservative upper bound on a sub-task body, in lines, used to bound
/// the triple scan from the task's start line.
pub const SCAN_WINDOW: usize = 180;

/// Hardware pointer for a 0-based line address, split into the high-14 and
/// low-13 halves of its 27-bit representation.
fn split_pointer(addr: usize) -> (String, String) {
    let bits = encode_bits((addr * 16) as u64, 27);
    let (high, low) = bits.split_at(14);
    (high.to_string(), low.to_string())
}

/// Classifies one storage-controller triple and returns the data address
/// its line-3 pointer fields must carry, or None when the triple does not
/// move input, weight, or output data.
fn classify(line1: &Word, line3: &Word, addrs: &DataAddress) -> Option<(usize, &'static str)> {
    let dw = line1.field(23, 24);
    let work_mode = line3.field(113, 114);
    match (work_mode, dw) {
        // DDR to memory controller: loads
        (0, 2) => Some((addrs.input_data_addr, "input")),
        (0, 1) => Some((addrs.weight_data_addr, "weight")),
        // memory controller to DDR: stores
        (2, 2) => Some((addrs.output_data_addr, "output")),
        _ => None,
    }
}

fn patch_task(lines: &mut [Word], actual_line: usize, addrs: &DataAddress) {
    let mut i = actual_line - 1;
    let scan_end = (i + SCAN_WINDOW).min(lines.len());
    while i + 3 <= scan_end {
        if lines[i].starts_with(CONFIG_PREFIX) {
            if let Some((addr, role)) = classify(&lines[i], &lines[i + 2], addrs) {
                let (high, low) = split_pointer(addr);
                lines[i + 2] = lines[i + 2].patch_bits(50, 63, &high).patch_bits(115, 127, &low);
                debug!(line = i + 3, role, addr, pointer = addr * 16, "patched storage-controller config");
            }
            i += 3;
        } else {
            i += 1;
        }
    }
}

/// Stage 4: walks every sub-task in layer-major, task-major order and
/// rewrites the pointer fields of its storage-controller triples in place,
/// then emits the final executable stream.
#[tracing::instrument(skip_all)]
pub fn patch_addresses(
    full_in: &Path,
    task_map: &TaskAddressMap,
    data_map: &DataAddressMap,
    final_out: &Path,
) -> StimResult<()> {
    let mut stream = LineBuffer::read_from(full_in)?;

    for (layer_idx, tasks) in task_map.layers() {
        for (&task_idx, task) in tasks {
            let Some(addrs) = data_map.get(layer_idx, task_idx) else {
                warn!(layer = layer_idx, task = task_idx, "no data addresses for task, skipping patch");
                continue;
            };
            debug!(
                layer = layer_idx,
                task = task_idx,
                start_line = task.actual_line,
                input = addrs.input_data_addr,
                weight = addrs.weight_data_addr,
                output = addrs.output_data_addr,
                "patching task"
            );
            patch_task(stream.lines_mut(), task.actual_line, addrs);
        }
    }

    stream.write_to(final_out)?;
    Ok(())
}
