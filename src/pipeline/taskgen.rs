use std::path::Path;

use tracing::info;

use crate::errors::{StimError, StimResult};
use crate::library::{signature, Library, OP_BLOB};
use crate::network::NetworkLayer;
use crate::pipeline::boundary::{recover_fixed, SEPARATOR_RUN};
use crate::stream::{read_words, LineBuffer};

/// Hardware page size in lines. Every sub-task body after the first must
/// start at a multiple of this.
pub const PAGE_LINES: usize = 256;

/// Stage 1: emits the original task stream (bodies separated by exactly
/// five sentinels) and the page-aligned rewrite that feeds the rest of the
/// pipeline. The original stream is a debugging checkpoint only.
#[tracing::instrument(skip_all)]
pub fn generate_tasks(
    network: &[NetworkLayer],
    library: &Library,
    original_out: &Path,
    aligned_out: &Path,
) -> StimResult<()> {
    let mut original = LineBuffer::new();
    for (li, layer) in network.iter().enumerate() {
        let count = layer.subtask_count();
        info!(layer = li + 1, operator = layer.operator(), subtasks = count, "generating task instructions");
        for k in 0..count {
            let width = layer.slice_width(k);
            let entry = library.find(layer, width).ok_or_else(|| StimError::LibraryMiss {
                layer: li + 1,
                task: k + 1,
                signature: signature(layer, width),
            })?;
            let blob = read_words(&entry.blob_path(OP_BLOB))?;
            original.extend(blob);
            original.push_sentinels(SEPARATOR_RUN);
        }
    }
    original.write_to(original_out)?;

    let spans = recover_fixed(original.lines());
    let mut aligned = LineBuffer::new();
    for (idx, span) in spans.iter().enumerate() {
        if idx > 0 {
            // pad to the next strict page multiple, so consecutive bodies
            // always have at least one sentinel between them
            let target = (aligned.len() / PAGE_LINES + 1) * PAGE_LINES;
            aligned.pad_to(target);
        }
        info!(task = idx + 1, start_addr = aligned.len(), lines = span.len, "aligned task body");
        aligned.extend(original.lines()[span.start..span.start + span.len].iter().cloned());
    }
    aligned.write_to(aligned_out)?;
    Ok(())
}
