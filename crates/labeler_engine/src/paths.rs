use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::dataset::DatasetFormat;

/// Suffix appended to an input's stem to name its labeled copy.
pub const OUTPUT_MARKER: &str = "_情緒分析結果";
/// Suffix of the statistics report derived from an output's base name.
pub const REPORT_MARKER: &str = "_統計報告";

const LOCK_PREFIXES: [&str; 2] = ["~$", ".~lock"];

pub fn output_path_for(input: &Path) -> PathBuf {
    let stem = file_stem(input);
    let name = match input.extension().and_then(OsStr::to_str) {
        Some(ext) => format!("{stem}{OUTPUT_MARKER}.{ext}"),
        None => format!("{stem}{OUTPUT_MARKER}"),
    };
    input.with_file_name(name)
}

pub fn report_path_for(output: &Path) -> PathBuf {
    let stem = file_stem(output);
    let base = stem.strip_suffix(OUTPUT_MARKER).unwrap_or(&stem);
    output.with_file_name(format!("{base}{REPORT_MARKER}.txt"))
}

/// Supported spreadsheet that is neither a prior output nor a lock/temp file.
pub fn is_candidate_input(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(OsStr::to_str) else {
        return false;
    };
    if name.starts_with('.') || LOCK_PREFIXES.iter().any(|prefix| name.starts_with(prefix)) {
        return false;
    }
    if DatasetFormat::from_path(path).is_none() {
        return false;
    }
    !file_stem(path).ends_with(OUTPUT_MARKER)
}

/// Candidate inputs in `dir`, sorted by file name.
pub fn discover_inputs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut inputs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .map(|entry| entry.path())
        .filter(|path| is_candidate_input(path))
        .collect();
    inputs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(inputs)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
