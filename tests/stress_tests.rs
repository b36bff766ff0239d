mod common;

use std::fs::File;
use std::io::{BufWriter, Write};

use common::*;

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

#[test]
#[ignore = "stress test"]
fn stress_large_file() {
    let lines = env_u64("FILEPROCESSOR_STRESS_LINES", 2_000_000);
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let path = temp_dir.path().join("large.txt");
    let mut writer = BufWriter::new(File::create(&path).expect("create"));
    for i in 0..lines {
        writeln!(writer, "line {i} has a few words in it").expect("write");
    }
    writer.flush().expect("flush");
    drop(writer);

    let result = run(&full_request(&path, Some("999"), 8, 1000)).expect("pipeline");

    assert_eq!(result.total_lines, lines);
    assert_eq!(result.total_words, lines * 8);
    assert!(result.matched_lines.windows(2).all(|p| p[0].line_number < p[1].line_number));
}
