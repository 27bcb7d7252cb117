use std::io;
use std::path::{Path, PathBuf};

use labeler_core::resume_index;
use labeler_logging::{labeler_info, labeler_warn};

use crate::dataset::{read_dataset, Dataset, DatasetError, LabelColumns};

/// Where labeling of a dataset starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumePoint {
    /// Working copy mutated by the row processor and flushed to the output.
    pub working: Dataset,
    pub labels: LabelColumns,
    /// 0-based index of the first row still lacking a label pair.
    pub resume_index: usize,
    /// True when the working copy was rebuilt from the input.
    pub fresh: bool,
}

/// The prior output exists but could not be inspected. Progress must not be
/// silently reset in that case.
#[derive(Debug, thiserror::Error)]
#[error("prior output {} could not be inspected: {source}", path.display())]
pub struct PriorOutputError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Derives the checkpoint from a pre-existing output artifact.
///
/// A missing, unparsable or incompatible artifact restarts from row 0 on the
/// input; one that exists but cannot be read is an error. Compatible means it carries both label columns, every input column,
/// and no more rows than the input; a shorter artifact is completed with the
/// input's remaining rows.
pub fn discover_resume_point(input: Dataset, output: &Path) -> Result<ResumePoint, PriorOutputError> {
    let exists = output.try_exists().map_err(|source| PriorOutputError {
        path: output.to_path_buf(),
        source,
    })?;
    if !exists {
        labeler_info!("No prior output at {:?}; starting from the first row", output);
        return Ok(fresh(input));
    }

    let existing = match read_dataset(output) {
        Ok(dataset) => dataset,
        Err(DatasetError::Io(source)) => {
            return Err(PriorOutputError {
                path: output.to_path_buf(),
                source,
            })
        }
        Err(err) => {
            labeler_warn!("Prior output {:?} is unreadable ({}); starting over", output, err);
            return Ok(fresh(input));
        }
    };

    let Some(labels) = existing.label_columns() else {
        labeler_warn!("Prior output {:?} has no label columns; starting over", output);
        return Ok(fresh(input));
    };
    if let Some(reason) = incompatibility(&existing, &input) {
        labeler_warn!("Prior output {:?} does not match its input ({}); starting over", output, reason);
        return Ok(fresh(input));
    }

    let mut working = existing;
    if working.len() < input.len() {
        working.append_rows_from(&input, working.len());
    }
    let resume_index = resume_index(working.labels(labels));
    labeler_info!(
        "Resuming {:?} at row {} of {}",
        output,
        resume_index + 1,
        working.len()
    );
    Ok(ResumePoint {
        working,
        labels,
        resume_index,
        fresh: false,
    })
}

fn fresh(mut input: Dataset) -> ResumePoint {
    let labels = input.reset_label_columns();
    ResumePoint {
        working: input,
        labels,
        resume_index: 0,
        fresh: true,
    }
}

fn incompatibility(existing: &Dataset, input: &Dataset) -> Option<String> {
    if existing.len() > input.len() {
        return Some(format!(
            "{} rows in output, {} in input",
            existing.len(),
            input.len()
        ));
    }
    input
        .headers()
        .iter()
        .find(|header| existing.column_index(header).is_none())
        .map(|header| format!("column {header:?} missing"))
}
