//! # fileprocessor
//!
//! Chunked, multi-threaded analysis of text files: line, word and character
//! counts plus literal pattern search, with a live progress bar.
//!
//! - [`chunk`]: line chunking of a byte stream
//! - [`source`]: input sources (files, in-memory buffers)
//! - [`pipeline`]: reader, worker pool, aggregator and progress threads
//! - [`report`]: plain-text summary

pub mod chunk;
pub mod cli;
pub mod config;
pub mod constants;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod source;
