//! Progress tracking and terminal rendering.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use tracing::warn;

use crate::constants::{CLEAR_LINE, PROGRESS_BAR_WIDTH};

/// Chunks processed so far against the estimated total. Written by workers,
/// read by the progress thread.
#[derive(Debug)]
pub struct ProgressState {
    processed: AtomicU64,
    total: u64,
    started: Instant,
}

impl ProgressState {
    pub fn new(total_chunks: u64) -> Self {
        Self {
            processed: AtomicU64::new(0),
            total: total_chunks,
            started: Instant::now(),
        }
    }

    pub fn record_chunk(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let processed = self.processed();
        let completion_pct = if self.total > 0 {
            (processed as f64 / self.total as f64 * 100.0).min(100.0)
        } else {
            0.0
        };
        ProgressSnapshot {
            processed_chunks: processed,
            total_chunks: self.total,
            elapsed: self.started.elapsed(),
            completion_pct,
        }
    }
}

/// Progress snapshot reported during a run.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub processed_chunks: u64,
    pub total_chunks: u64,
    pub elapsed: Duration,
    /// Completion percentage (0.0 - 100.0)
    pub completion_pct: f64,
}

impl ProgressSnapshot {
    pub fn is_complete(&self) -> bool {
        self.processed_chunks >= self.total_chunks
    }
}

/// Progress callback trait for long-running runs.
pub trait ProgressReporter: Send + Sync {
    fn on_progress(&self, snapshot: &ProgressSnapshot);

    /// Called once when reporting stops, before the run returns.
    fn finish(&self) {}
}

pub struct ProgressConfig {
    pub reporter: Arc<dyn ProgressReporter>,
    pub interval: Duration,
}

/// Running progress thread. Dropping `done_tx` is the stop signal; the
/// thread then reports one last snapshot before finishing.
pub struct ProgressHandle {
    done_tx: Sender<()>,
    handle: thread::JoinHandle<()>,
}

impl ProgressHandle {
    pub fn stop(self) {
        drop(self.done_tx);
        if self.handle.join().is_err() {
            warn!("progress thread panicked");
        }
    }
}

pub fn spawn_progress_thread(cfg: ProgressConfig, state: Arc<ProgressState>) -> ProgressHandle {
    let (done_tx, done_rx) = bounded::<()>(0);
    let handle = thread::spawn(move || {
        loop {
            let snapshot = state.snapshot();
            if snapshot.is_complete() {
                break;
            }
            cfg.reporter.on_progress(&snapshot);
            match done_rx.recv_timeout(cfg.interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    cfg.reporter.on_progress(&state.snapshot());
                    break;
                }
            }
        }
        cfg.reporter.finish();
    });
    ProgressHandle { done_tx, handle }
}

/// Renders a single-line bar, overwritten in place with `\r`.
pub struct TerminalProgress<W: Write + Send> {
    out: Mutex<W>,
}

impl TerminalProgress<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TerminalProgress<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> ProgressReporter for TerminalProgress<W> {
    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        if let Ok(mut out) = self.out.lock() {
            let _ = write!(out, "\r{}", render_progress_line(snapshot));
            let _ = out.flush();
        }
    }

    fn finish(&self) {
        if let Ok(mut out) = self.out.lock() {
            let _ = write!(out, "{CLEAR_LINE}");
            let _ = out.flush();
        }
    }
}

pub fn render_progress_line(snapshot: &ProgressSnapshot) -> String {
    let completed = if snapshot.total_chunks > 0 {
        let cells = PROGRESS_BAR_WIDTH as u64 * snapshot.processed_chunks / snapshot.total_chunks;
        (cells as usize).min(PROGRESS_BAR_WIDTH)
    } else {
        0
    };
    format!(
        "{}{} {:.1}% ({}/{} chunks) {}",
        "█".repeat(completed),
        "░".repeat(PROGRESS_BAR_WIDTH - completed),
        snapshot.completion_pct,
        snapshot.processed_chunks,
        snapshot.total_chunks,
        format_elapsed(snapshot.elapsed)
    )
}

/// Whole seconds, e.g. `7s`, `2m5s`, `1h0m3s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = (elapsed.as_millis() + 500) / 1000;
    let (hours, minutes, seconds) = (secs / 3600, secs % 3600 / 60, secs % 60);
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingReporter {
        updates: AtomicUsize,
        finishes: AtomicUsize,
    }

    impl ProgressReporter for CountingReporter {
        fn on_progress(&self, _snapshot: &ProgressSnapshot) {
            self.updates.fetch_add(1, Ordering::Relaxed);
        }

        fn finish(&self) {
            self.finishes.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn snapshot(processed: u64, total: u64, secs: u64) -> ProgressSnapshot {
        let state = ProgressState::new(total);
        for _ in 0..processed {
            state.record_chunk();
        }
        ProgressSnapshot {
            elapsed: Duration::from_secs(secs),
            ..state.snapshot()
        }
    }

    #[test]
    fn renders_half_full_bar() {
        let line = render_progress_line(&snapshot(5, 10, 3));
        assert!(line.starts_with(&"█".repeat(20)));
        assert!(line.contains(&"░".repeat(20)));
        assert!(line.ends_with(" 50.0% (5/10 chunks) 3s"));
    }

    #[test]
    fn overshoot_is_capped() {
        let snap = snapshot(7, 3, 0);
        assert_eq!(snap.completion_pct, 100.0);
        let line = render_progress_line(&snap);
        assert!(line.starts_with(&"█".repeat(PROGRESS_BAR_WIDTH)));
        assert!(!line.contains('░'));
    }

    #[test]
    fn formats_elapsed_like_rounded_durations() {
        assert_eq!(format_elapsed(Duration::from_millis(400)), "0s");
        assert_eq!(format_elapsed(Duration::from_millis(1_600)), "2s");
        assert_eq!(format_elapsed(Duration::from_secs(125)), "2m5s");
        assert_eq!(format_elapsed(Duration::from_secs(3_603)), "1h0m3s");
    }

    #[test]
    fn stop_signal_ends_thread_even_if_estimate_is_never_reached() {
        let reporter = Arc::new(CountingReporter::default());
        let state = Arc::new(ProgressState::new(1_000));
        let handle = spawn_progress_thread(
            ProgressConfig {
                reporter: reporter.clone(),
                interval: Duration::from_secs(60),
            },
            state,
        );
        handle.stop();
        assert!(reporter.updates.load(Ordering::Relaxed) >= 1);
        assert_eq!(reporter.finishes.load(Ordering::Relaxed), 1);
    }

    #[derive(Default)]
    struct LastSeenReporter {
        last: Mutex<Option<u64>>,
    }

    impl ProgressReporter for LastSeenReporter {
        fn on_progress(&self, snapshot: &ProgressSnapshot) {
            if let Ok(mut last) = self.last.lock() {
                *last = Some(snapshot.processed_chunks);
            }
        }
    }

    #[test]
    fn stop_reports_chunks_recorded_after_last_poll() {
        let reporter = Arc::new(LastSeenReporter::default());
        let state = Arc::new(ProgressState::new(1_000));
        let handle = spawn_progress_thread(
            ProgressConfig {
                reporter: reporter.clone(),
                interval: Duration::from_secs(60),
            },
            state.clone(),
        );
        for _ in 0..7 {
            state.record_chunk();
        }
        handle.stop();
        assert_eq!(*reporter.last.lock().expect("lock"), Some(7));
    }

    #[test]
    fn stops_polling_once_estimate_is_reached() {
        let reporter = Arc::new(CountingReporter::default());
        let state = Arc::new(ProgressState::new(1));
        state.record_chunk();
        let handle = spawn_progress_thread(
            ProgressConfig {
                reporter: reporter.clone(),
                interval: Duration::from_millis(1),
            },
            state,
        );
        handle.handle.join().expect("progress thread");
        assert_eq!(reporter.updates.load(Ordering::Relaxed), 0);
        assert_eq!(reporter.finishes.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn terminal_progress_clears_its_line() {
        let progress = TerminalProgress::new(Vec::new());
        progress.on_progress(&snapshot(1, 4, 0));
        progress.finish();
        let text = String::from_utf8(progress.into_inner()).expect("utf8");
        assert!(text.starts_with('\r'));
        assert!(text.contains("(1/4 chunks)"));
        assert!(text.ends_with(CLEAR_LINE));
    }
}
