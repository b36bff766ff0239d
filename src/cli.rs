use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::Config;
use crate::pipeline::ProcessingRequest;

#[derive(Parser, Debug)]
#[command(
    name = "fileprocessor",
    author,
    version,
    about = "File processing CLI",
    long_about = "A CLI tool for processing and analyzing text files with various options"
)]
pub struct CliOptions {
    /// Log pipeline activity to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read and analyze a file
    Read(ReadArgs),
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// File to read
    pub file: PathBuf,

    /// Count words in the file
    #[arg(short = 'c', long)]
    pub word_count: bool,

    /// Count characters in the file
    #[arg(short = 'n', long)]
    pub character_count: bool,

    /// Search for a pattern in the file
    #[arg(short, long)]
    pub search: Option<String>,

    /// Number of concurrent workers (default from built-in config)
    #[arg(short, long)]
    pub worker_count: Option<usize>,

    /// Lines per chunk (default from built-in config)
    #[arg(long)]
    pub chunk_lines: Option<usize>,

    /// Longest accepted line in bytes (default from built-in config)
    #[arg(long)]
    pub max_line_bytes: Option<usize>,

    /// Do not draw the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl ReadArgs {
    pub fn to_request(&self, cfg: &Config) -> ProcessingRequest {
        ProcessingRequest {
            enable_word_count: self.word_count,
            enable_char_count: self.character_count,
            search_pattern: self.search.clone(),
            worker_count: self.worker_count.unwrap_or(cfg.worker_count),
            chunk_line_limit: self.chunk_lines.unwrap_or(cfg.chunk_line_limit),
            max_line_bytes: self.max_line_bytes.unwrap_or(cfg.max_line_bytes),
            ..ProcessingRequest::new(self.file.clone(), cfg)
        }
    }
}

pub fn parse() -> CliOptions {
    CliOptions::parse()
}
