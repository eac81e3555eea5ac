use crate::word::Word;

/// Fixed separator length between sub-task bodies in the original stream.
pub const SEPARATOR_RUN: usize = 5;

/// One recovered sub-task body: 0-based start line and body length,
/// sentinels excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSpan {
    pub start: usize,
    pub len: usize,
}

/// Recovers sub-task boundaries from the original stream, where bodies are
/// separated by exactly five sentinel lines. A shorter sentinel run inside
/// a body does not close it.
pub fn recover_fixed(lines: &[Word]) -> Vec<TaskSpan> {
    let mut spans = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        while i < lines.len() && lines[i].is_sentinel() {
            i += 1;
        }
        if i >= lines.len() {
            break;
        }
        let start = i;

        let mut consecutive = 0;
        let mut j = i;
        let mut closed = false;
        while j < lines.len() {
            if lines[j].is_sentinel() {
                consecutive += 1;
                if consecutive == SEPARATOR_RUN {
                    // body ends just before the first of the five sentinels
                    let end = j + 1 - SEPARATOR_RUN;
                    spans.push(TaskSpan { start, len: end - start });
                    closed = true;
                    break;
                }
            } else {
                consecutive = 0;
            }
            j += 1;
        }
        if !closed {
            // end of file: strip whatever trailing sentinels remain
            let mut end = lines.len();
            while end > start && lines[end - 1].is_sentinel() {
                end -= 1;
            }
            if end > start {
                spans.push(TaskSpan { start, len: end - start });
            }
            break;
        }
        i = j + 1;
    }
    spans
}

/// Recovers sub-task boundaries from the aligned stream, where any
/// non-empty run of sentinels separates bodies.
pub fn recover_aligned(lines: &[Word]) -> Vec<TaskSpan> {
    let mut spans = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        while i < lines.len() && lines[i].is_sentinel() {
            i += 1;
        }
        if i >= lines.len() {
            break;
        }
        let start = i;
        let mut j = i;
        while j < lines.len() && !lines[j].is_sentinel() {
            j += 1;
        }
        spans.push(TaskSpan { start, len: j - start });
        i = j;
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word::encode_bits;

    fn body(tag: u64) -> Word {
        Word::parse(&encode_bits(tag, 128)).unwrap()
    }

    fn stream(parts: &[(usize, usize)]) -> Vec<Word> {
        // (body_len, following_sentinel_run) pairs
        let mut lines = Vec::new();
        for (idx, &(len, run)) in parts.iter().enumerate() {
            for k in 0..len {
                lines.push(body((idx * 1000 + k) as u64 + 2));
            }
            for _ in 0..run {
                lines.push(Word::sentinel());
            }
        }
        lines
    }

    #[test]
    fn fixed_separator_closes_after_five() {
        let lines = stream(&[(3, 5), (7, 5)]);
        let spans = recover_fixed(&lines);
        assert_eq!(spans, vec![TaskSpan { start: 0, len: 3 }, TaskSpan { start: 8, len: 7 }]);
    }

    #[test]
    fn fixed_separator_keeps_short_runs_inside_body() {
        // a 4-long sentinel run belongs to the body, not the separator
        let mut lines = Vec::new();
        lines.push(body(2));
        for _ in 0..4 {
            lines.push(Word::sentinel());
        }
        lines.push(body(3));
        for _ in 0..5 {
            lines.push(Word::sentinel());
        }
        let spans = recover_fixed(&lines);
        assert_eq!(spans, vec![TaskSpan { start: 0, len: 6 }]);
    }

    #[test]
    fn fixed_separator_strips_trailing_sentinels_at_eof() {
        let lines = stream(&[(3, 2)]);
        let spans = recover_fixed(&lines);
        assert_eq!(spans, vec![TaskSpan { start: 0, len: 3 }]);
    }

    #[test]
    fn aligned_recovery_handles_varied_runs() {
        let lines = stream(&[(37, 1), (12, 123), (9, 256), (4, 0)]);
        let spans = recover_aligned(&lines);
        assert_eq!(
            spans,
            vec![
                TaskSpan { start: 0, len: 37 },
                TaskSpan { start: 38, len: 12 },
                TaskSpan { start: 173, len: 9 },
                TaskSpan { start: 438, len: 4 },
            ]
        );
    }

    #[test]
    fn aligned_recovery_skips_leading_padding() {
        let mut lines = vec![Word::sentinel(); 3];
        lines.push(body(2));
        let spans = recover_aligned(&lines);
        assert_eq!(spans, vec![TaskSpan { start: 3, len: 1 }]);
    }
}
