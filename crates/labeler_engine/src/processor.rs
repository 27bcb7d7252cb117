use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use labeler_core::{
    detect_text_column, is_blank_text, resume_index, FlushSchedule, RetryPolicy, Sentiment,
    LABEL_CODE_COLUMN, LABEL_NAME_COLUMN,
};
use labeler_logging::{labeler_debug, labeler_info, labeler_warn};
use tokio_util::sync::CancellationToken;

use crate::dataset::{encode_dataset, read_dataset, Dataset, DatasetError, DatasetFormat, LabelColumns};
use crate::persist::{write_atomically, PersistError};
use crate::resume::{discover_resume_point, PriorOutputError, ResumePoint};
use crate::{Classifier, DatasetJob, ProgressEvent};

const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    /// Explicit text column; auto-detected when `None`.
    pub text_column: Option<String>,
    /// Pause after every row that reached the service.
    pub inter_row_delay: Duration,
    pub flush: FlushSchedule,
    pub retry: RetryPolicy,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            text_column: None,
            inter_row_delay: Duration::from_secs(3),
            flush: FlushSchedule::default(),
            retry: RetryPolicy::default(),
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Sink that reports progress through the global logger.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::ResumeDiscovered {
                dataset,
                resume_index,
                total_rows,
                text_column,
            } => labeler_info!(
                "{}: {} rows, text column {:?}, starting at row {}",
                dataset,
                total_rows,
                text_column,
                resume_index + 1
            ),
            ProgressEvent::RowStarted {
                row,
                total_rows,
                preview,
            } => labeler_info!("Row {}/{}: {}", row + 1, total_rows, preview),
            ProgressEvent::RetryScheduled {
                row,
                attempt,
                category,
                wait,
                message,
            } => labeler_warn!(
                "Row {} attempt {} failed [{}]: {}; retrying in {}s",
                row + 1,
                attempt,
                category,
                message,
                wait.as_secs_f64()
            ),
            ProgressEvent::RowRecorded {
                row,
                label,
                blank,
                attempts,
            } => {
                if blank {
                    labeler_info!("Row {}: blank text -> {}", row + 1, label);
                } else if attempts > 1 {
                    labeler_info!("Row {}: {} after {} retries", row + 1, label, attempts - 1);
                } else {
                    labeler_info!("Row {}: {}", row + 1, label);
                }
            }
            ProgressEvent::Flushed {
                labeled_rows,
                total_rows,
            } => labeler_info!("Saved progress: {}/{} rows labeled", labeled_rows, total_rows),
            ProgressEvent::Finished { total_rows } => {
                labeler_info!("All {} rows labeled", total_rows)
            }
            ProgressEvent::Interrupted {
                labeled_rows,
                total_rows,
            } => labeler_warn!(
                "Interrupted; progress saved at {}/{} rows",
                labeled_rows,
                total_rows
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessSummary {
    pub total_rows: usize,
    pub resumed_at: usize,
    pub classified: usize,
    pub blank: usize,
    pub flushes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Completed(ProcessSummary),
    /// Cancelled; the working copy was flushed once and can be resumed.
    Interrupted(ProcessSummary),
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to read dataset {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: DatasetError,
    },
    #[error("text column {0:?} not found")]
    MissingTextColumn(String),
    #[error("no usable text column found")]
    NoTextColumn,
    #[error(transparent)]
    PriorOutput(#[from] PriorOutputError),
    #[error("unsupported output format: {}", .0.display())]
    UnsupportedOutput(PathBuf),
    #[error("failed to encode working copy: {0}")]
    Encode(#[source] DatasetError),
    #[error("failed to write {}: {source}", path.display())]
    Flush {
        path: PathBuf,
        #[source]
        source: PersistError,
    },
}

/// Labels the rows of one dataset at a time, sequentially.
pub struct RowProcessor {
    classifier: Arc<dyn Classifier>,
    settings: ProcessorSettings,
    sink: Arc<dyn ProgressSink>,
}

/// Per-dataset state owned by a single `process` call.
struct DatasetRun<'a> {
    job: &'a DatasetJob,
    format: DatasetFormat,
    working: Dataset,
    labels: LabelColumns,
    text_col: usize,
    dirty: bool,
    summary: ProcessSummary,
}

impl RowProcessor {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        settings: ProcessorSettings,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            classifier,
            settings,
            sink,
        }
    }

    pub async fn process(
        &self,
        job: &DatasetJob,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutcome, ProcessError> {
        let format = DatasetFormat::from_path(&job.output)
            .ok_or_else(|| ProcessError::UnsupportedOutput(job.output.clone()))?;
        let input = read_dataset(&job.input).map_err(|source| ProcessError::Read {
            path: job.input.clone(),
            source,
        })?;
        let text_header = self.resolve_text_column(&input)?;

        let ResumePoint {
            working,
            labels,
            resume_index,
            fresh,
        } = discover_resume_point(input, &job.output)?;
        let text_col = working
            .column_index(&text_header)
            .ok_or_else(|| ProcessError::MissingTextColumn(text_header.clone()))?;

        let total_rows = working.len();
        self.sink.emit(ProgressEvent::ResumeDiscovered {
            dataset: job.name(),
            resume_index,
            total_rows,
            text_column: text_header,
        });

        let mut run = DatasetRun {
            job,
            format,
            working,
            labels,
            text_col,
            dirty: fresh,
            summary: ProcessSummary {
                total_rows,
                resumed_at: resume_index,
                ..ProcessSummary::default()
            },
        };

        for index in resume_index..total_rows {
            if cancel.is_cancelled() {
                return self.interrupt(&mut run);
            }

            let text = run.working.cell(index, run.text_col).to_string();
            if is_blank_text(&text) {
                self.record(&mut run, index, Sentiment::Neutral, true, 0)?;
                continue;
            }

            self.sink.emit(ProgressEvent::RowStarted {
                row: index,
                total_rows,
                preview: preview(&text),
            });
            let Some((label, attempts)) = self.classify_until_success(index, &text, cancel).await
            else {
                return self.interrupt(&mut run);
            };
            self.record(&mut run, index, label, false, attempts)?;

            let paused = sleep_or_cancel(self.settings.inter_row_delay, cancel).await;
            if !paused && index + 1 < total_rows {
                return self.interrupt(&mut run);
            }
        }

        if run.dirty {
            self.flush(&mut run)?;
        }
        self.sink.emit(ProgressEvent::Finished { total_rows });
        Ok(ProcessOutcome::Completed(run.summary))
    }

    fn resolve_text_column(&self, input: &Dataset) -> Result<String, ProcessError> {
        let col = match &self.settings.text_column {
            Some(name) => input
                .column_index(name)
                .ok_or_else(|| ProcessError::MissingTextColumn(name.clone()))?,
            None => detect_text_column(
                input.headers(),
                input.rows(),
                &[LABEL_CODE_COLUMN, LABEL_NAME_COLUMN],
            )
            .ok_or(ProcessError::NoTextColumn)?,
        };
        Ok(input.headers()[col].clone())
    }

    /// Unbounded retry loop; returns `None` only when cancelled.
    async fn classify_until_success(
        &self,
        row: usize,
        text: &str,
        cancel: &CancellationToken,
    ) -> Option<(Sentiment, u32)> {
        let mut attempt: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return None;
            }
            attempt = attempt.saturating_add(1);

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                result = self.classifier.classify(text) => result,
            };
            let err = match result {
                Ok(label) => return Some((label, attempt)),
                Err(err) => err,
            };

            let wait = self.settings.retry.backoff(err.category, attempt);
            self.sink.emit(ProgressEvent::RetryScheduled {
                row,
                attempt,
                category: err.category,
                wait,
                message: err.message,
            });
            if !sleep_or_cancel(wait, cancel).await {
                return None;
            }
        }
    }

    fn record(
        &self,
        run: &mut DatasetRun<'_>,
        index: usize,
        label: Sentiment,
        blank: bool,
        attempts: u32,
    ) -> Result<(), ProcessError> {
        run.working.set_label(index, run.labels, label);
        run.dirty = true;
        if blank {
            run.summary.blank += 1;
        } else {
            run.summary.classified += 1;
        }
        self.sink.emit(ProgressEvent::RowRecorded {
            row: index,
            label,
            blank,
            attempts,
        });

        if self.settings.flush.is_due(index, run.summary.total_rows) {
            self.flush(run)?;
        }
        Ok(())
    }

    fn flush(&self, run: &mut DatasetRun<'_>) -> Result<(), ProcessError> {
        let bytes = encode_dataset(&run.working, run.format).map_err(ProcessError::Encode)?;
        write_atomically(&run.job.output, &bytes).map_err(|source| ProcessError::Flush {
            path: run.job.output.clone(),
            source,
        })?;
        run.dirty = false;
        run.summary.flushes += 1;

        let labeled_rows = resume_index(run.working.labels(run.labels));
        labeler_debug!("Flushed {:?} with {} labeled rows", run.job.output, labeled_rows);
        self.sink.emit(ProgressEvent::Flushed {
            labeled_rows,
            total_rows: run.summary.total_rows,
        });
        Ok(())
    }

    /// Exactly one flush of the working copy as it stands, then stop.
    fn interrupt(&self, run: &mut DatasetRun<'_>) -> Result<ProcessOutcome, ProcessError> {
        self.flush(run)?;
        self.sink.emit(ProgressEvent::Interrupted {
            labeled_rows: resume_index(run.working.labels(run.labels)),
            total_rows: run.summary.total_rows,
        });
        Ok(ProcessOutcome::Interrupted(run.summary))
    }
}

/// Returns false when cancelled before `duration` elapsed.
async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    if duration.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
