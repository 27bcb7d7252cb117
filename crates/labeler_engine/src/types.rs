use std::path::{Path, PathBuf};
use std::time::Duration;

use labeler_core::{FailureCategory, Sentiment};

use crate::paths::{output_path_for, report_path_for};

/// One dataset to label: where it is read from and where labels go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl DatasetJob {
    pub fn for_input(input: impl Into<PathBuf>) -> Self {
        let input = input.into();
        let output = output_path_for(&input);
        Self { input, output }
    }

    pub fn report_path(&self) -> PathBuf {
        report_path_for(&self.output)
    }

    pub fn name(&self) -> String {
        display_name(&self.input)
    }
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    ResumeDiscovered {
        dataset: String,
        resume_index: usize,
        total_rows: usize,
        text_column: String,
    },
    RowStarted {
        row: usize,
        total_rows: usize,
        preview: String,
    },
    RetryScheduled {
        row: usize,
        attempt: u32,
        category: FailureCategory,
        wait: Duration,
        message: String,
    },
    RowRecorded {
        row: usize,
        label: Sentiment,
        blank: bool,
        attempts: u32,
    },
    Flushed {
        labeled_rows: usize,
        total_rows: usize,
    },
    Finished {
        total_rows: usize,
    },
    Interrupted {
        labeled_rows: usize,
        total_rows: usize,
    },
}

/// A failed classification attempt. Always retried by the row processor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{category}: {message}")]
pub struct ClassifyError {
    pub category: FailureCategory,
    pub message: String,
}

impl ClassifyError {
    pub fn new(category: FailureCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    /// Transport failures are categorized from their text.
    pub fn transport(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            category: FailureCategory::from_error_text(&message),
            message,
        }
    }

    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::new(FailureCategory::InvalidOutput, message)
    }
}
