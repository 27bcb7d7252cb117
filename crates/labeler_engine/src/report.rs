use std::path::{Path, PathBuf};

use labeler_core::{LabelStats, LABEL_CODE_COLUMN, LABEL_NAME_COLUMN};

use crate::dataset::{read_dataset, Dataset, DatasetError};
use crate::paths::report_path_for;
use crate::persist::{write_atomically, PersistError};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: DatasetError,
    },
    #[error("{} has no label column", .0.display())]
    MissingLabels(PathBuf),
    #[error("failed to write report: {0}")]
    Write(#[from] PersistError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub stats: LabelStats,
    pub path: PathBuf,
}

/// Counts labels, preferring the name column and falling back to the codes.
pub fn label_stats(dataset: &Dataset) -> Option<LabelStats> {
    let col = dataset
        .column_index(LABEL_NAME_COLUMN)
        .or_else(|| dataset.column_index(LABEL_CODE_COLUMN))?;
    Some(LabelStats::from_labels(dataset.column_values(col)))
}

/// Reads a labeled output and writes its statistics next to it.
pub fn generate_report(output: &Path) -> Result<ReportSummary, ReportError> {
    let dataset = read_dataset(output).map_err(|source| ReportError::Read {
        path: output.to_path_buf(),
        source,
    })?;
    let stats = label_stats(&dataset).ok_or_else(|| ReportError::MissingLabels(output.to_path_buf()))?;
    let path = write_atomically(&report_path_for(output), stats.render_report().as_bytes())?;
    Ok(ReportSummary { stats, path })
}
