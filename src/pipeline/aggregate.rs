use crate::chunk::{Chunk, MatchedLine};

/// Totals across every processed chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateResult {
    pub total_words: u64,
    pub total_chars: u64,
    pub total_lines: u64,
    pub chunks_processed: u64,
    /// Arrival order until `finalize`, line order afterwards.
    pub matched_lines: Vec<MatchedLine>,
}

impl AggregateResult {
    pub fn merge(&mut self, chunk: Chunk) {
        self.total_words += chunk.word_count;
        self.total_chars += chunk.char_count;
        self.total_lines += chunk.line_count();
        self.chunks_processed += 1;
        self.matched_lines.extend(chunk.matched_lines);
    }

    /// Restore file order for matched lines; workers finish out of order.
    pub fn finalize(mut self) -> Self {
        self.matched_lines.sort_by_key(|m| m.line_number);
        self
    }
}
