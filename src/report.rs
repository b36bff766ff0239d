//! Plain-text run summary.

use std::io::{self, Write};

use crate::pipeline::{AggregateResult, ProcessingRequest};

/// Write the summary block. Counters that were not requested are omitted;
/// the line count is always shown.
pub fn write_summary<W: Write>(
    out: &mut W,
    request: &ProcessingRequest,
    result: &AggregateResult,
) -> io::Result<()> {
    writeln!(out, "Processing complete!")?;
    writeln!(out, "Lines: {}", result.total_lines)?;
    if request.enable_word_count {
        writeln!(out, "Words: {}", result.total_words)?;
    }
    if request.enable_char_count {
        writeln!(out, "Characters: {}", result.total_chars)?;
    }
    if let Some(pattern) = request.pattern() {
        writeln!(
            out,
            "Matches for \"{pattern}\": {}",
            result.matched_lines.len()
        )?;
        for matched in &result.matched_lines {
            writeln!(out, "  {}: {}", matched.line_number, matched.text)?;
        }
    }
    out.flush()
}
