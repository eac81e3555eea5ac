use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::errors::{StimError, StimResult};
use crate::word::Word;

/// Reads a line-oriented word file, skipping blank lines. Any remaining
/// line that is not 128 binary digits makes the file a malformed blob.
pub fn read_words(path: &Path) -> StimResult<Vec<Word>> {
    if !path.exists() {
        return Err(StimError::MalformedBlob {
            path: path.to_path_buf(),
            reason: "file is missing".to_string(),
        });
    }
    let reader = BufReader::new(File::open(path)?);
    let mut words = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let word = Word::parse(trimmed).ok_or_else(|| StimError::MalformedBlob {
            path: path.to_path_buf(),
            reason: format!("line {} is not 128 binary digits", idx + 1),
        })?;
        words.push(word);
    }
    Ok(words)
}

/// Growable ordered sequence of fixed-width words with a 0-based line
/// counter. Emitters append bodies and sentinel runs through it;
/// address-producing code captures `len()` at the moment of interest.
#[derive(Default)]
pub struct LineBuffer {
    lines: Vec<Word>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_words(lines: Vec<Word>) -> Self {
        Self { lines }
    }

    pub fn read_from(path: &Path) -> StimResult<Self> {
        Ok(Self::from_words(read_words(path)?))
    }

    /// Number of lines emitted so far; also the 0-based address the next
    /// pushed line will occupy.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn push(&mut self, word: Word) {
        self.lines.push(word);
    }

    pub fn extend(&mut self, words: impl IntoIterator<Item = Word>) {
        self.lines.extend(words);
    }

    pub fn push_sentinels(&mut self, count: usize) {
        self.lines.extend(std::iter::repeat_with(Word::sentinel).take(count));
    }

    /// Pads with sentinels until `len()` reaches `target`.
    pub fn pad_to(&mut self, target: usize) {
        while self.lines.len() < target {
            self.lines.push(Word::sentinel());
        }
    }

    pub fn lines(&self) -> &[Word] {
        &self.lines
    }

    pub fn lines_mut(&mut self) -> &mut [Word] {
        &mut self.lines
    }

    pub fn write_to(&self, path: &Path) -> StimResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        for word in &self.lines {
            writeln!(writer, "{word}")?;
        }
        writer.flush()?;
        Ok(())
    }
}
