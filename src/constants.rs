//! Shared pipeline constants.

/// Floor for the bounded work and results channels.
pub const MIN_CHANNEL_CAPACITY: usize = 4;

/// Longest line, in bytes excluding the terminator, a reader accepts by default.
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// Width of the rendered progress bar, in cells.
pub const PROGRESS_BAR_WIDTH: usize = 40;

/// Carriage return plus ANSI "erase to end of line".
pub const CLEAR_LINE: &str = "\r\x1b[K";
