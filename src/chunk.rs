use std::io::{self, BufRead, Read};

use crate::constants::DEFAULT_MAX_LINE_BYTES;
use crate::source::SourceError;

/// A line that contained the search pattern, with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MatchedLine {
    pub line_number: u64,
    pub text: String,
}

/// A bounded run of consecutive source lines.
///
/// The reader fills `lines`; a worker fills the statistics.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    pub id: u64,
    /// 1-based number of the first line in `lines`.
    pub first_line: u64,
    pub lines: Vec<String>,
    pub word_count: u64,
    pub char_count: u64,
    pub matched_lines: Vec<MatchedLine>,
}

impl Chunk {
    pub fn line_count(&self) -> u64 {
        self.lines.len() as u64
    }
}

/// Groups lines from a reader into chunks of at most `line_limit` lines.
///
/// Lines split on `\n` with one trailing `\r` removed. A final line without a
/// terminator still counts. A line longer than `max_line_bytes` is a read
/// error, and at most that many bytes (plus terminator) are buffered for it.
/// Once a read error is yielded the iterator is exhausted and the pending
/// partial chunk is dropped.
pub struct ChunkReader<R> {
    reader: R,
    line_limit: usize,
    max_line_bytes: usize,
    next_id: u64,
    next_line: u64,
    buf: Vec<u8>,
    done: bool,
}

impl<R: BufRead> ChunkReader<R> {
    pub fn new(reader: R, line_limit: usize) -> Self {
        Self {
            reader,
            line_limit: line_limit.max(1),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            next_id: 0,
            next_line: 1,
            buf: Vec::new(),
            done: false,
        }
    }

    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes.max(1);
        self
    }

    fn read_line(&mut self) -> Result<Option<String>, SourceError> {
        self.buf.clear();
        // Room for the longest allowed line plus `\r\n`.
        let cap = (self.max_line_bytes as u64).saturating_add(2);
        let n = (&mut self.reader)
            .take(cap)
            .read_until(b'\n', &mut self.buf)
            .map_err(SourceError::Read)?;
        if n == 0 {
            return Ok(None);
        }
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        let line_number = self.next_line;
        if self.buf.len() > self.max_line_bytes {
            return Err(SourceError::Read(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line {line_number} exceeds {} bytes", self.max_line_bytes),
            )));
        }
        let line = String::from_utf8(std::mem::take(&mut self.buf)).map_err(|_| {
            SourceError::Read(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line {line_number} is not valid UTF-8"),
            ))
        })?;
        self.next_line += 1;
        Ok(Some(line))
    }
}

impl<R: BufRead> Iterator for ChunkReader<R> {
    type Item = Result<Chunk, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let first_line = self.next_line;
        let mut lines = Vec::with_capacity(self.line_limit);
        while lines.len() < self.line_limit {
            match self.read_line() {
                Ok(Some(line)) => lines.push(line),
                Ok(None) => {
                    self.done = true;
                    break;
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
        if lines.is_empty() {
            return None;
        }
        let chunk = Chunk {
            id: self.next_id,
            first_line,
            lines,
            ..Chunk::default()
        };
        self.next_id += 1;
        Some(Ok(chunk))
    }
}

/// Rough chunk count for progress display: `bytes / assumed_chunk_bytes + 1`.
pub fn estimate_chunk_count(total_bytes: u64, assumed_chunk_bytes: u64) -> u64 {
    if assumed_chunk_bytes == 0 {
        return 1;
    }
    total_bytes / assumed_chunk_bytes + 1
}
