use std::io::IsTerminal;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tracing::{info, warn};

use fileprocessor::cli::{self, Command, ReadArgs};
use fileprocessor::config::{self, Config};
use fileprocessor::logging;
use fileprocessor::pipeline::{self, ProgressConfig};
use fileprocessor::pipeline::progress::TerminalProgress;
use fileprocessor::report;

fn main() -> Result<()> {
    let cli_opts = cli::parse();
    logging::init_logging(cli_opts.verbose);

    let cfg = config::load_config().context("loading built-in defaults")?;

    match &cli_opts.command {
        Command::Read(args) => run_read(&cfg, args),
    }
}

fn run_read(cfg: &Config, args: &ReadArgs) -> Result<()> {
    let request = args.to_request(cfg);

    let cancel_flag = Arc::new(AtomicBool::new(false));
    {
        let flag = cancel_flag.clone();
        if let Err(err) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
            warn!("failed to install Ctrl-C handler: {err}");
        }
    }

    let progress = if !args.no_progress && std::io::stdout().is_terminal() {
        Some(ProgressConfig {
            reporter: Arc::new(TerminalProgress::stdout()),
            interval: cfg.progress_interval(),
        })
    } else {
        None
    };

    let result = pipeline::run_pipeline_with_cancel(cfg, &request, cancel_flag, progress)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    report::write_summary(&mut out, &request, &result).context("writing summary")?;

    info!("fileprocessor run finished");
    Ok(())
}
