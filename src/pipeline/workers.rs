//! # Pipeline Workers
//!
//! Thread spawning for the reader, analysis and aggregation stages.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use memchr::memmem;
use tracing::{debug, info, warn};

use crate::chunk::{Chunk, ChunkReader, MatchedLine};
use crate::source::InputSource;

use super::aggregate::AggregateResult;
use super::progress::ProgressState;
use super::{PipelineError, ProcessingRequest};

/// Stateless per-chunk analysis, cloned into every worker.
#[derive(Debug, Clone)]
pub struct ChunkAnalyzer {
    word_count: bool,
    char_count: bool,
    finder: Option<memmem::Finder<'static>>,
}

impl ChunkAnalyzer {
    pub fn new(word_count: bool, char_count: bool, pattern: Option<&str>) -> Self {
        let finder = pattern
            .filter(|p| !p.is_empty())
            .map(|p| memmem::Finder::new(p.as_bytes()).into_owned());
        Self {
            word_count,
            char_count,
            finder,
        }
    }

    pub fn from_request(request: &ProcessingRequest) -> Self {
        Self::new(
            request.enable_word_count,
            request.enable_char_count,
            request.pattern(),
        )
    }

    pub fn analyze(&self, mut chunk: Chunk) -> Chunk {
        let mut words = 0u64;
        let mut chars = 0u64;
        let mut matched = Vec::new();

        for (offset, line) in chunk.lines.iter().enumerate() {
            if self.word_count {
                words += line.split_whitespace().count() as u64;
            }
            if self.char_count {
                chars += line.len() as u64;
            }
            if let Some(finder) = &self.finder {
                if finder.find(line.as_bytes()).is_some() {
                    matched.push(MatchedLine {
                        line_number: chunk.first_line + offset as u64,
                        text: line.clone(),
                    });
                }
            }
        }

        chunk.word_count = words;
        chunk.char_count = chars;
        chunk.matched_lines = matched;
        chunk
    }
}

/// Spawn the reader thread.
///
/// The work sender is dropped when the thread returns, closing the channel
/// whether the source was exhausted, failed or the run was cancelled.
pub fn spawn_reader_thread(
    source: Box<dyn InputSource>,
    line_limit: usize,
    max_line_bytes: usize,
    tx: Sender<Chunk>,
    cancel_flag: Option<Arc<AtomicBool>>,
) -> thread::JoinHandle<Result<u64, PipelineError>> {
    thread::spawn(move || {
        let name = source.name().to_string();
        let mut chunks = ChunkReader::new(source.into_reader(), line_limit)
            .with_max_line_bytes(max_line_bytes);
        let mut sent = 0u64;

        loop {
            if let Some(flag) = &cancel_flag {
                if flag.load(Ordering::Relaxed) {
                    info!("shutdown requested; stopping reader after {sent} chunks");
                    return Err(PipelineError::Cancelled);
                }
            }
            let chunk = match chunks.next() {
                Some(Ok(chunk)) => chunk,
                Some(Err(err)) => {
                    warn!("read failed on {name} after {sent} chunks: {err}");
                    return Err(err.into());
                }
                None => break,
            };
            let chunk_id = chunk.id;
            if let Err(err) = tx.send(chunk) {
                warn!("work channel closed while sending chunk {chunk_id}: {err}");
                return Err(PipelineError::ChannelClosed(chunk_id));
            }
            sent += 1;
        }

        debug!("reader finished source={name} chunks={sent}");
        Ok(sent)
    })
}

/// Spawn analysis worker threads
pub fn spawn_analysis_workers(
    workers: usize,
    analyzer: ChunkAnalyzer,
    rx: Receiver<Chunk>,
    result_tx: Sender<Chunk>,
    progress: Arc<ProgressState>,
) -> Vec<thread::JoinHandle<()>> {
    let mut handles = Vec::new();
    let worker_count = workers.max(1);

    for worker_id in 0..worker_count {
        let analyzer = analyzer.clone();
        let rx = rx.clone();
        let result_tx = result_tx.clone();
        let progress = progress.clone();

        handles.push(thread::spawn(move || {
            let mut processed = 0u64;
            for job in rx {
                let chunk_id = job.id;
                let result = analyzer.analyze(job);
                if let Err(err) = result_tx.send(result) {
                    warn!("results channel closed while sending chunk {chunk_id}: {err}");
                    break;
                }
                progress.record_chunk();
                processed += 1;
            }
            debug!("worker {worker_id} exiting after {processed} chunks");
        }));
    }

    handles
}

/// Spawn the aggregation thread. It owns the accumulator outright, so merges
/// are serialized without a lock.
pub fn spawn_aggregator_thread(rx: Receiver<Chunk>) -> thread::JoinHandle<AggregateResult> {
    thread::spawn(move || {
        let mut aggregate = AggregateResult::default();
        for chunk in rx {
            aggregate.merge(chunk);
        }
        aggregate
    })
}
