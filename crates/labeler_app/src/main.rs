//! Labeler CLI
//!
//! Labels every spreadsheet in a directory with a sentiment per row, saving
//! progress so an interrupted run resumes where it stopped.

mod config;
mod logging;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use labeler_engine::{Coordinator, GeminiClassifier, LogProgressSink, RowProcessor};
use labeler_logging::{labeler_error, labeler_info, labeler_warn};
use tokio_util::sync::CancellationToken;

use config::{AppConfig, DEFAULT_CONFIG_FILE};
use logging::{LogDestination, DEFAULT_LOG_FILE};

#[derive(Parser)]
#[command(name = "labeler")]
#[command(about = "Label spreadsheet rows with sentiment, resumably", long_about = None)]
struct Cli {
    /// Directory scanned for .xlsx and .csv datasets
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Path to the JSON configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Column holding the text to classify; detected when omitted
    #[arg(long)]
    text_column: Option<String>,

    /// File receiving a copy of the log
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Log to the terminal only
    #[arg(long)]
    no_log_file: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let destination = if cli.no_log_file {
        LogDestination::Terminal
    } else {
        LogDestination::Both(cli.log_file.clone())
    };
    logging::initialize(destination, labeler_logging::level_for(cli.verbose));

    let mut config = match AppConfig::load(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            labeler_error!("Startup configuration error: {}", err);
            return Err(err.into());
        }
    };
    if let Some(column) = cli.text_column {
        config.text_column = Some(column);
    }
    labeler_info!("Configuration loaded from {:?}: {:?}", cli.config, config);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(run(&cli.dir, config))
}

async fn run(dir: &Path, config: AppConfig) -> Result<()> {
    let classifier = GeminiClassifier::new(config.client_settings())
        .context("failed to build classification client")?;
    let processor = RowProcessor::new(
        Arc::new(classifier),
        config.processor_settings(),
        Arc::new(LogProgressSink),
    );
    let coordinator = Coordinator::new(processor);

    let cancel = CancellationToken::new();
    spawn_interrupt_watcher(cancel.clone());
    if let Some(limit) = config.max_runtime() {
        spawn_deadline(limit, cancel.clone());
    }

    let summary = coordinator
        .run(dir, &cancel)
        .await
        .with_context(|| format!("failed to scan {}", dir.display()))?;

    for (path, err) in &summary.failed {
        labeler_warn!("Skipped {:?}: {}", path, err);
    }
    if summary.cancelled {
        labeler_info!(
            "Stopped early after {} dataset(s); rerun to resume",
            summary.completed.len()
        );
    } else {
        labeler_info!(
            "Run finished: {} completed, {} failed",
            summary.completed.len(),
            summary.failed.len()
        );
    }
    Ok(())
}

fn spawn_interrupt_watcher(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                labeler_warn!("Interrupt received; saving progress and stopping");
                cancel.cancel();
            }
            Err(err) => labeler_warn!("Could not listen for Ctrl-C: {}", err),
        }
    });
}

fn spawn_deadline(limit: Duration, cancel: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(limit) => {
                labeler_warn!("Maximum runtime of {}s reached; stopping", limit.as_secs());
                cancel.cancel();
            }
        }
    });
}
