use std::io;
use std::path::{Path, PathBuf};

use labeler_logging::{labeler_error, labeler_info, labeler_warn};
use tokio_util::sync::CancellationToken;

use crate::paths::discover_inputs;
use crate::processor::{ProcessOutcome, RowProcessor};
use crate::report::generate_report;
use crate::DatasetJob;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: Vec<PathBuf>,
    /// Datasets that hit a fatal error, with the error text.
    pub failed: Vec<(PathBuf, String)>,
    /// Dataset whose processing was interrupted, if any.
    pub interrupted: Option<PathBuf>,
    pub cancelled: bool,
}

/// Drives the row processor over every dataset found in a directory.
pub struct Coordinator {
    processor: RowProcessor,
}

impl Coordinator {
    pub fn new(processor: RowProcessor) -> Self {
        Self { processor }
    }

    pub async fn run(&self, dir: &Path, cancel: &CancellationToken) -> io::Result<RunSummary> {
        let inputs = discover_inputs(dir)?;
        if inputs.is_empty() {
            labeler_warn!("No spreadsheet found in {:?}", dir);
            return Ok(RunSummary::default());
        }
        labeler_info!("Found {} dataset(s) in {:?}", inputs.len(), dir);
        self.run_jobs(inputs.into_iter().map(DatasetJob::for_input), cancel)
            .await
    }

    /// Processes jobs in order; one dataset's failure never stops the others,
    /// a cancellation stops the whole run.
    pub async fn run_jobs(
        &self,
        jobs: impl IntoIterator<Item = DatasetJob>,
        cancel: &CancellationToken,
    ) -> io::Result<RunSummary> {
        let mut summary = RunSummary::default();

        for job in jobs {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            labeler_info!("Processing {:?} -> {:?}", job.input, job.output);

            match self.processor.process(&job, cancel).await {
                Ok(ProcessOutcome::Completed(stats)) => {
                    labeler_info!(
                        "Finished {}: {} classified, {} blank, {} flushes",
                        job.name(),
                        stats.classified,
                        stats.blank,
                        stats.flushes
                    );
                    match generate_report(&job.output) {
                        Ok(report) => labeler_info!(
                            "Report written to {:?} (positive {}, neutral {}, negative {})",
                            report.path,
                            report.stats.positive,
                            report.stats.neutral,
                            report.stats.negative
                        ),
                        Err(err) => labeler_warn!("Report for {} failed: {}", job.name(), err),
                    }
                    summary.completed.push(job.input);
                }
                Ok(ProcessOutcome::Interrupted(_)) => {
                    labeler_warn!("{} interrupted; progress saved to {:?}", job.name(), job.output);
                    summary.interrupted = Some(job.input);
                    summary.cancelled = true;
                    break;
                }
                Err(err) => {
                    labeler_error!("Failed to process {}: {}; continuing", job.name(), err);
                    summary.failed.push((job.input, err.to_string()));
                }
            }
        }

        if cancel.is_cancelled() {
            summary.cancelled = true;
        }
        Ok(summary)
    }
}
