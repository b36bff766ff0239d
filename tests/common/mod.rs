//! Shared helpers for pipeline integration tests.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use fileprocessor::config::{self, Config};
use fileprocessor::pipeline::{self, AggregateResult, PipelineError, ProcessingRequest};

pub fn test_config() -> Config {
    config::load_config().expect("config")
}

pub fn write_input(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write input");
    path
}

/// Request with every analysis switched on.
pub fn full_request(
    path: &Path,
    pattern: Option<&str>,
    workers: usize,
    chunk_lines: usize,
) -> ProcessingRequest {
    let cfg = test_config();
    ProcessingRequest {
        enable_word_count: true,
        enable_char_count: true,
        search_pattern: pattern.map(str::to_string),
        worker_count: workers,
        chunk_line_limit: chunk_lines,
        ..ProcessingRequest::new(path, &cfg)
    }
}

pub fn run(request: &ProcessingRequest) -> Result<AggregateResult, PipelineError> {
    pipeline::run_pipeline(&test_config(), request, None)
}

pub fn match_set(result: &AggregateResult) -> BTreeSet<String> {
    result
        .matched_lines
        .iter()
        .map(|m| m.text.clone())
        .collect()
}

/// Deterministic multi-line text with varied spacing and some "needle" lines.
pub fn generated_text(lines: usize) -> String {
    let words = ["alpha", "beta", "gamma", "needle", "delta", "epsilon"];
    let mut text = String::new();
    for i in 0..lines {
        let count = i % 7;
        let mut line = String::new();
        for j in 0..count {
            if j > 0 {
                line.push_str(if (i + j) % 3 == 0 { "  " } else { " " });
            }
            line.push_str(words[(i * 31 + j * 7) % words.len()]);
        }
        text.push_str(&line);
        text.push('\n');
    }
    text
}

/// Reference totals computed without the pipeline.
pub fn expected_totals(text: &str) -> (u64, u64, u64) {
    let lines: Vec<&str> = text.lines().collect();
    let words = lines.iter().map(|l| l.split_whitespace().count() as u64).sum();
    let chars = lines.iter().map(|l| l.len() as u64).sum();
    (lines.len() as u64, words, chars)
}
