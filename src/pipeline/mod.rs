//! # Pipeline Module
//!
//! Streams a text source through chunking, parallel analysis and aggregation.
//! The reader, every worker, the aggregator and the progress reporter run on
//! their own threads, connected by bounded channels.

pub mod aggregate;
pub mod progress;
pub mod workers;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::chunk::{Chunk, estimate_chunk_count};
use crate::config::Config;
use crate::constants::MIN_CHANNEL_CAPACITY;
use crate::source::{self, InputSource, SourceError};

pub use aggregate::AggregateResult;
pub use progress::{ProgressConfig, ProgressReporter, ProgressSnapshot, ProgressState};
use progress::ProgressHandle;
use workers::ChunkAnalyzer;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    Configuration(String),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("processing cancelled")]
    Cancelled,
    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
    #[error("work channel closed while sending chunk {0}")]
    ChannelClosed(u64),
}

/// What to compute for one run, and how wide to fan out.
#[derive(Debug, Clone)]
pub struct ProcessingRequest {
    pub source: PathBuf,
    pub enable_word_count: bool,
    pub enable_char_count: bool,
    pub search_pattern: Option<String>,
    pub worker_count: usize,
    pub chunk_line_limit: usize,
    pub max_line_bytes: usize,
}

impl ProcessingRequest {
    /// Request with every analysis disabled and sizing taken from `cfg`.
    pub fn new(source: impl Into<PathBuf>, cfg: &Config) -> Self {
        Self {
            source: source.into(),
            enable_word_count: false,
            enable_char_count: false,
            search_pattern: None,
            worker_count: cfg.worker_count,
            chunk_line_limit: cfg.chunk_line_limit,
            max_line_bytes: cfg.max_line_bytes,
        }
    }

    /// The search pattern, if one was given and is non-empty.
    pub fn pattern(&self) -> Option<&str> {
        self.search_pattern.as_deref().filter(|p| !p.is_empty())
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.worker_count < 1 {
            return Err(PipelineError::Configuration(format!(
                "worker_count must be at least 1, got {}",
                self.worker_count
            )));
        }
        if self.chunk_line_limit == 0 {
            return Err(PipelineError::Configuration(
                "chunk_line_limit must be greater than 0".to_string(),
            ));
        }
        if self.max_line_bytes == 0 {
            return Err(PipelineError::Configuration(
                "max_line_bytes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    Init,
    Running,
    WorkersDraining,
    AggregatorDraining,
    Done,
    Failed,
}

/// Run the pipeline over the file named in `request`.
pub fn run_pipeline(
    cfg: &Config,
    request: &ProcessingRequest,
    progress: Option<ProgressConfig>,
) -> Result<AggregateResult, PipelineError> {
    request.validate()?;
    let source = source::open_source(&request.source)?;
    PipelineRunner::new(cfg, request, None, progress).run(source)
}

/// Run the pipeline with an external cancellation flag (e.g., Ctrl+C).
pub fn run_pipeline_with_cancel(
    cfg: &Config,
    request: &ProcessingRequest,
    cancel_flag: Arc<AtomicBool>,
    progress: Option<ProgressConfig>,
) -> Result<AggregateResult, PipelineError> {
    request.validate()?;
    let source = source::open_source(&request.source)?;
    PipelineRunner::new(cfg, request, Some(cancel_flag), progress).run(source)
}

/// Run the pipeline over an already opened source. `request.source` is only
/// used for logging.
pub fn run_source(
    cfg: &Config,
    request: &ProcessingRequest,
    source: Box<dyn InputSource>,
    cancel_flag: Option<Arc<AtomicBool>>,
    progress: Option<ProgressConfig>,
) -> Result<AggregateResult, PipelineError> {
    request.validate()?;
    PipelineRunner::new(cfg, request, cancel_flag, progress).run(source)
}

struct PipelineChannels {
    work_tx: Sender<Chunk>,
    work_rx: Receiver<Chunk>,
    result_tx: Sender<Chunk>,
    result_rx: Receiver<Chunk>,
}

struct StageHandles {
    reader_handle: JoinHandle<Result<u64, PipelineError>>,
    worker_handles: Vec<JoinHandle<()>>,
    aggregator_handle: JoinHandle<AggregateResult>,
    progress_handle: Option<ProgressHandle>,
}

struct PipelineRunner<'a> {
    cfg: &'a Config,
    request: &'a ProcessingRequest,
    cancel_flag: Option<Arc<AtomicBool>>,
    progress: Option<ProgressConfig>,
    state: PipelineState,
}

impl<'a> PipelineRunner<'a> {
    fn new(
        cfg: &'a Config,
        request: &'a ProcessingRequest,
        cancel_flag: Option<Arc<AtomicBool>>,
        progress: Option<ProgressConfig>,
    ) -> Self {
        Self {
            cfg,
            request,
            cancel_flag,
            progress,
            state: PipelineState::Init,
        }
    }

    fn transition(&mut self, next: PipelineState) {
        debug!("pipeline state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn run(mut self, source: Box<dyn InputSource>) -> Result<AggregateResult, PipelineError> {
        let total_chunks = estimate_chunk_count(source.size_hint(), self.cfg.assumed_chunk_bytes);
        let progress_state = Arc::new(ProgressState::new(total_chunks));
        info!(
            "starting source={} workers={} chunk_lines={} max_line_bytes={} estimated_chunks={}",
            source.name(),
            self.request.worker_count,
            self.request.chunk_line_limit,
            self.request.max_line_bytes,
            total_chunks
        );

        let progress_handle = self
            .progress
            .take()
            .map(|cfg| progress::spawn_progress_thread(cfg, progress_state.clone()));

        self.transition(PipelineState::Running);
        let channels = self.setup_channels();
        let (handles, result_tx) =
            self.spawn_stages(source, channels, &progress_state, progress_handle);

        self.finalize(handles, result_tx)
    }

    fn setup_channels(&self) -> PipelineChannels {
        let channel_cap = self
            .request
            .worker_count
            .saturating_mul(self.cfg.channel_capacity_multiplier)
            .max(MIN_CHANNEL_CAPACITY);
        let (work_tx, work_rx) = bounded::<Chunk>(channel_cap);
        let (result_tx, result_rx) = bounded::<Chunk>(channel_cap);
        PipelineChannels {
            work_tx,
            work_rx,
            result_tx,
            result_rx,
        }
    }

    /// Spawns every stage. The work receiver and sender are handed off
    /// entirely; only one results sender stays with the controller so it
    /// decides when the aggregator may finish.
    fn spawn_stages(
        &self,
        source: Box<dyn InputSource>,
        channels: PipelineChannels,
        progress_state: &Arc<ProgressState>,
        progress_handle: Option<ProgressHandle>,
    ) -> (StageHandles, Sender<Chunk>) {
        let PipelineChannels {
            work_tx,
            work_rx,
            result_tx,
            result_rx,
        } = channels;

        let aggregator_handle = workers::spawn_aggregator_thread(result_rx);

        let analyzer = ChunkAnalyzer::from_request(self.request);
        let worker_handles = workers::spawn_analysis_workers(
            self.request.worker_count,
            analyzer,
            work_rx,
            result_tx.clone(),
            progress_state.clone(),
        );

        let reader_handle = workers::spawn_reader_thread(
            source,
            self.request.chunk_line_limit,
            self.request.max_line_bytes,
            work_tx,
            self.cancel_flag.clone(),
        );

        let handles = StageHandles {
            reader_handle,
            worker_handles,
            aggregator_handle,
            progress_handle,
        };
        (handles, result_tx)
    }

    fn finalize(
        mut self,
        handles: StageHandles,
        result_tx: Sender<Chunk>,
    ) -> Result<AggregateResult, PipelineError> {
        let StageHandles {
            reader_handle,
            worker_handles,
            aggregator_handle,
            progress_handle,
        } = handles;

        // The reader drops the work sender on exit, which lets workers drain.
        let read_outcome = reader_handle
            .join()
            .unwrap_or(Err(PipelineError::ThreadPanicked("reader")));

        self.transition(PipelineState::WorkersDraining);
        let mut worker_panicked = false;
        for handle in worker_handles {
            if handle.join().is_err() {
                worker_panicked = true;
            }
        }
        drop(result_tx);

        self.transition(PipelineState::AggregatorDraining);
        let aggregate = aggregator_handle.join();

        if let Some(handle) = progress_handle {
            handle.stop();
        }

        let outcome = resolve_outcome(read_outcome, worker_panicked, aggregate);

        match &outcome {
            Ok(result) => {
                self.transition(PipelineState::Done);
                info!(
                    "run_summary chunks={} lines={} words={} chars={} matches={}",
                    result.chunks_processed,
                    result.total_lines,
                    result.total_words,
                    result.total_chars,
                    result.matched_lines.len()
                );
            }
            Err(err) => {
                self.transition(PipelineState::Failed);
                warn!("pipeline failed: {err}");
            }
        }
        outcome
    }
}

/// Pick the error to surface once every stage has been joined. A reader that
/// hit a closed work channel is reporting a dead downstream stage, so the
/// panic that caused it wins.
fn resolve_outcome(
    read_outcome: Result<u64, PipelineError>,
    worker_panicked: bool,
    aggregate: thread::Result<AggregateResult>,
) -> Result<AggregateResult, PipelineError> {
    match (read_outcome, worker_panicked, aggregate) {
        (Err(err @ PipelineError::ChannelClosed(_)), true, _) => {
            debug!("reader stopped early: {err}");
            Err(PipelineError::ThreadPanicked("worker"))
        }
        (Err(err @ PipelineError::ChannelClosed(_)), false, Err(_)) => {
            debug!("reader stopped early: {err}");
            Err(PipelineError::ThreadPanicked("aggregator"))
        }
        (Err(err), _, _) => Err(err),
        (Ok(_), true, _) => Err(PipelineError::ThreadPanicked("worker")),
        (Ok(_), false, Err(_)) => Err(PipelineError::ThreadPanicked("aggregator")),
        (Ok(chunks_read), false, Ok(aggregate)) => {
            if aggregate.chunks_processed != chunks_read {
                warn!(
                    "chunk accounting mismatch: read={} aggregated={}",
                    chunks_read, aggregate.chunks_processed
                );
            }
            Ok(aggregate.finalize())
        }
    }
}
