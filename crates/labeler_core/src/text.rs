/// Literal written by spreadsheet tooling for a missing cell.
pub const MISSING_VALUE_MARKER: &str = "nan";

const SAMPLE_SIZE: usize = 3;
const MIN_SAMPLE_AVG_CHARS: f64 = 5.0;

/// Rows with blank text are labeled neutral without asking the service.
pub fn is_blank_text(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || trimmed == MISSING_VALUE_MARKER
}

/// Best-effort guess of the free-text column.
///
/// A column qualifies when its first few non-blank values are not all numeric
/// and average more than five characters; among those the one with the longest
/// average value over every row wins. Columns named in `exclude` are skipped.
pub fn detect_text_column(headers: &[String], rows: &[Vec<String>], exclude: &[&str]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;

    for (col, header) in headers.iter().enumerate() {
        if exclude.contains(&header.as_str()) {
            continue;
        }
        let sample: Vec<&str> = rows
            .iter()
            .map(|row| cell(row, col))
            .filter(|value| !is_blank_text(value))
            .take(SAMPLE_SIZE)
            .collect();
        if sample.is_empty() || sample.iter().all(|value| looks_numeric(value)) {
            continue;
        }
        if average_chars(sample.iter().copied()) <= MIN_SAMPLE_AVG_CHARS {
            continue;
        }

        let score = average_chars(rows.iter().map(|row| cell(row, col)));
        match best {
            Some((_, best_score)) if best_score >= score => {}
            _ => best = Some((col, score)),
        }
    }

    best.map(|(col, _)| col)
}

fn cell(row: &[String], col: usize) -> &str {
    row.get(col).map(String::as_str).unwrap_or("")
}

fn looks_numeric(value: &str) -> bool {
    value.trim().parse::<f64>().is_ok()
}

fn average_chars<'a>(values: impl Iterator<Item = &'a str>) -> f64 {
    let (count, chars) = values.fold((0usize, 0usize), |(count, chars), value| {
        (count + 1, chars + value.chars().count())
    });
    if count == 0 {
        0.0
    } else {
        chars as f64 / count as f64
    }
}
