use std::path::Path;

use tracing::{info, warn};

use crate::addresses::{TaskAddress, TaskAddressMap};
use crate::errors::{StimError, StimResult};
use crate::network::{subtask_counts, NetworkLayer};
use crate::pipeline::boundary::recover_aligned;
use crate::pipeline::taskgen::PAGE_LINES;
use crate::stream::{read_words, LineBuffer};
use crate::word::{encode_bits, Word};

/// Total lines of the controller region prefixed to the task stream.
pub const CONTROL_REGION: usize = 1536;
/// 0-based line index where the FIFO directory starts (line 513).
pub const FIFO_START: usize = 512;

/// Fixed global-controller words occupying the first five lines. Only the
/// FIFO count field of the first word is patched at generation time.
const CONTROLLER_PROLOGUE: [&str; 5] = [
    "10001010111000000000000000000100111010110001011100000000000000001000100011100000000000000000101111100110011101001010110110000000",
    "10000110000100110000000000000000100001100011010000000000000000001000101001000000000000000000001011100010000100011001000000000000",
    "10110000111001110000000000000001110000001110000000000000000100101000101011100000000000000000010011101000000110001011100000000000",
    "11000011000000000000000000001100110100000000000000000000000001001011010000000000000000000000000010110100000000000000000000000000",
    "10110100000000000000000000000000101101000000000000000000000000001011010000000000000000000000000011111100000000000000000000000000",
];

/// One FIFO directory word: 64 zero bits, the body's hardware pointer
/// (line address times 16) as 32 bits, then the instruction count as 32
/// bits.
fn fifo_word(origin_addr: usize, instruction_nums: usize) -> Word {
    Word::zeros()
        .patch_bits(64, 95, &encode_bits((origin_addr * 16) as u64, 32))
        .patch_bits(96, 127, &encode_bits(instruction_nums as u64, 32))
}

/// Stage 2: prefixes the aligned task stream with the 1536-line controller
/// region and records every sub-task's final address in the sidecar map.
///
/// Sub-tasks are attributed to layers by walking the per-layer counts in
/// order. Extra sub-tasks beyond what the network declares land under an
/// overflow layer key with a warning, or abort the run in strict mode.
#[tracing::instrument(skip_all)]
pub fn generate_control(
    aligned_in: &Path,
    network: &[NetworkLayer],
    combined_out: &Path,
    sidecar_out: &Path,
    strict: bool,
) -> StimResult<TaskAddressMap> {
    let task_lines = read_words(aligned_in)?;
    let spans = recover_aligned(&task_lines);
    info!(detected = spans.len(), "sub-tasks detected in aligned stream");

    let counts = subtask_counts(network);
    let expected: usize = counts.iter().sum();
    if spans.len() != expected {
        if strict {
            return Err(StimError::TaskCountMismatch { detected: spans.len(), expected });
        }
        warn!(detected = spans.len(), expected, "sub-task count does not match the network");
    }

    let mut map = TaskAddressMap::new();
    let mut current_layer = 1usize;
    let mut tasks_in_layer = 0usize;
    for (idx, span) in spans.iter().enumerate() {
        let actual_line = span.start + CONTROL_REGION + 1;
        let origin_addr = actual_line - 1;
        if idx > 0 && origin_addr % PAGE_LINES != 0 {
            return Err(StimError::AlignmentViolation { task: idx + 1, addr: origin_addr });
        }

        if current_layer <= counts.len() && tasks_in_layer >= counts[current_layer - 1] {
            current_layer += 1;
            tasks_in_layer = 0;
        }
        if current_layer > counts.len() {
            warn!(task = idx + 1, layer = current_layer, "sub-task overflows the declared layers");
        }

        info!(
            task = idx + 1,
            layer = current_layer,
            actual_line,
            origin_addr,
            instructions = span.len,
            "task address assigned"
        );
        map.insert(
            current_layer,
            idx + 1,
            TaskAddress { actual_line, origin_addr, instruction_nums: span.len },
        );
        tasks_in_layer += 1;
    }

    let mut combined = LineBuffer::new();
    combined.push(
        Word::from_literal(CONTROLLER_PROLOGUE[0])
            .patch_bits(80, 95, &encode_bits(spans.len() as u64, 16)),
    );
    for literal in &CONTROLLER_PROLOGUE[1..] {
        combined.push(Word::from_literal(literal));
    }
    combined.pad_to(FIFO_START);
    for span in &spans {
        combined.push(fifo_word(span.start + CONTROL_REGION, span.len));
    }
    combined.pad_to(CONTROL_REGION);
    combined.extend(task_lines);
    combined.write_to(combined_out)?;

    map.save(sidecar_out)?;
    Ok(map)
}
