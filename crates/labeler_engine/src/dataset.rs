use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use labeler_core::{Sentiment, LABEL_CODE_COLUMN, LABEL_NAME_COLUMN};
use rust_xlsxwriter::{Format, Workbook};

use crate::decode::{decode_text, DecodeError};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const DATETIME_FORMAT: &str = "yyyy/m/d h:mm:ss";
const DURATION_FORMAT: &str = "[h]:mm:ss";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Csv,
    Xlsx,
}

impl DatasetFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("csv") {
            Some(DatasetFormat::Csv)
        } else if ext.eq_ignore_ascii_case("xlsx") {
            Some(DatasetFormat::Xlsx)
        } else {
            None
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("unsupported dataset format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("text decoding error: {0}")]
    Decode(#[from] DecodeError),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("workbook error: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("workbook write error: {0}")]
    WorkbookWrite(#[from] rust_xlsxwriter::XlsxError),
    #[error("workbook has no worksheet")]
    NoWorksheet,
    #[error("dataset has no header row")]
    MissingHeader,
    #[error("dataset too large for the format: {0}")]
    TooLarge(String),
}

/// Positions of the two derived label columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelColumns {
    pub code: usize,
    pub name: usize,
}

/// Workbook type of a cell. CSV cells and label cells are always `Text`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CellKind {
    #[default]
    Text,
    Number(f64),
    Bool(bool),
    /// Excel serial date-time.
    DateTime(f64),
    /// Excel serial duration.
    Duration(f64),
}

/// A header row plus records. Every cell is available as text; workbook cells
/// also remember their kind so numbers and dates are written back as such.
/// Every row is padded to the header width so cell access never goes out of
/// bounds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    kinds: Vec<Vec<CellKind>>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self::with_kinds(headers, rows, Vec::new())
    }

    fn with_kinds(headers: Vec<String>, rows: Vec<Vec<String>>, kinds: Vec<Vec<CellKind>>) -> Self {
        let mut dataset = Self {
            headers,
            rows,
            kinds,
        };
        dataset.pad_rows();
        dataset
    }

    fn pad_rows(&mut self) {
        let width = self.headers.len();
        for row in &mut self.rows {
            if row.len() < width {
                row.resize(width, String::new());
            }
        }
        self.kinds.resize_with(self.rows.len(), Vec::new);
        for (row, kinds) in self.rows.iter().zip(self.kinds.iter_mut()) {
            kinds.resize(row.len(), CellKind::Text);
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn cell_kind(&self, row: usize, col: usize) -> CellKind {
        self.kinds
            .get(row)
            .and_then(|kinds| kinds.get(col))
            .copied()
            .unwrap_or_default()
    }

    pub fn column_values(&self, col: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(col).map(String::as_str).unwrap_or(""))
    }

    pub fn label_columns(&self) -> Option<LabelColumns> {
        Some(LabelColumns {
            code: self.column_index(LABEL_CODE_COLUMN)?,
            name: self.column_index(LABEL_NAME_COLUMN)?,
        })
    }

    /// Adds the derived columns when missing and clears every label.
    pub fn reset_label_columns(&mut self) -> LabelColumns {
        let code = self.ensure_column(LABEL_CODE_COLUMN);
        let name = self.ensure_column(LABEL_NAME_COLUMN);
        for (row, kinds) in self.rows.iter_mut().zip(self.kinds.iter_mut()) {
            row[code].clear();
            row[name].clear();
            kinds[code] = CellKind::Text;
            kinds[name] = CellKind::Text;
        }
        LabelColumns { code, name }
    }

    fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.headers.push(name.to_string());
        self.pad_rows();
        self.headers.len() - 1
    }

    pub fn labels(&self, cols: LabelColumns) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.rows
            .iter()
            .map(move |row| (row[cols.code].as_str(), row[cols.name].as_str()))
    }

    pub fn set_label(&mut self, row: usize, cols: LabelColumns, label: Sentiment) {
        if let Some(cells) = self.rows.get_mut(row) {
            cells[cols.code] = label.code().to_string();
            cells[cols.name] = label.name().to_string();
        }
        if let Some(kinds) = self.kinds.get_mut(row) {
            kinds[cols.code] = CellKind::Text;
            kinds[cols.name] = CellKind::Text;
        }
    }

    /// Appends the rows of `source` starting at `from`, matching columns by
    /// header name. Columns unknown to `source` stay empty.
    pub fn append_rows_from(&mut self, source: &Dataset, from: usize) {
        let mapping: Vec<Option<usize>> = self
            .headers
            .iter()
            .map(|header| source.column_index(header))
            .collect();
        for row in from..source.len() {
            let cells = mapping
                .iter()
                .map(|col| col.map(|c| source.cell(row, c).to_string()).unwrap_or_default())
                .collect();
            let kinds = mapping
                .iter()
                .map(|col| col.map(|c| source.cell_kind(row, c)).unwrap_or_default())
                .collect();
            self.rows.push(cells);
            self.kinds.push(kinds);
        }
    }
}

pub fn read_dataset(path: &Path) -> Result<Dataset, DatasetError> {
    match DatasetFormat::from_path(path) {
        Some(DatasetFormat::Csv) => read_csv(path),
        Some(DatasetFormat::Xlsx) => read_xlsx(path),
        None => Err(DatasetError::UnsupportedFormat(path.to_path_buf())),
    }
}

pub fn encode_dataset(dataset: &Dataset, format: DatasetFormat) -> Result<Vec<u8>, DatasetError> {
    match format {
        DatasetFormat::Csv => encode_csv(dataset),
        DatasetFormat::Xlsx => encode_xlsx(dataset),
    }
}

fn read_csv(path: &Path) -> Result<Dataset, DatasetError> {
    let bytes = fs::read(path)?;
    let decoded = decode_text(&bytes)?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(decoded.text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() {
        return Err(DatasetError::MissingHeader);
    }
    let rows = reader
        .records()
        .map(|record| record.map(|r| r.iter().map(str::to_string).collect()))
        .collect::<Result<Vec<Vec<String>>, csv::Error>>()?;
    Ok(Dataset::new(headers, rows))
}

/// UTF-8 with BOM so spreadsheet tools pick the right encoding.
fn encode_csv(dataset: &Dataset) -> Result<Vec<u8>, DatasetError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(UTF8_BOM.to_vec());
    writer.write_record(dataset.headers())?;
    for row in dataset.rows() {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|err| DatasetError::Io(err.into_error()))
}

/// Reads the first worksheet; its first row is the header.
fn read_xlsx(path: &Path) -> Result<Dataset, DatasetError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(DatasetError::NoWorksheet)??;

    let mut rows = range.rows();
    let headers = rows
        .next()
        .ok_or(DatasetError::MissingHeader)?
        .iter()
        .map(|cell| cell.to_string())
        .collect();
    let (texts, kinds): (Vec<Vec<String>>, Vec<Vec<CellKind>>) = rows
        .map(|row| row.iter().map(typed_cell).unzip::<_, _, Vec<String>, Vec<CellKind>>())
        .unzip();
    Ok(Dataset::with_kinds(headers, texts, kinds))
}

fn typed_cell(cell: &Data) -> (String, CellKind) {
    let kind = match cell {
        Data::Int(value) => CellKind::Number(*value as f64),
        Data::Float(value) => CellKind::Number(*value),
        Data::Bool(value) => CellKind::Bool(*value),
        Data::DateTime(value) if value.is_duration() => CellKind::Duration(value.as_f64()),
        Data::DateTime(value) => CellKind::DateTime(value.as_f64()),
        _ => CellKind::Text,
    };
    (cell.to_string(), kind)
}

fn encode_xlsx(dataset: &Dataset) -> Result<Vec<u8>, DatasetError> {
    let datetime_format = Format::new().set_num_format(DATETIME_FORMAT);
    let duration_format = Format::new().set_num_format(DURATION_FORMAT);
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, header) in dataset.headers().iter().enumerate() {
        worksheet.write_string(0, xlsx_col(col)?, header)?;
    }
    for (idx, row) in dataset.rows().iter().enumerate() {
        let row_num = xlsx_row(idx + 1)?;
        for (col, value) in row.iter().enumerate() {
            let col_num = xlsx_col(col)?;
            match dataset.cell_kind(idx, col) {
                CellKind::Text if value.is_empty() => {}
                CellKind::Text => {
                    worksheet.write_string(row_num, col_num, value)?;
                }
                CellKind::Number(number) => {
                    worksheet.write_number(row_num, col_num, number)?;
                }
                CellKind::Bool(flag) => {
                    worksheet.write_boolean(row_num, col_num, flag)?;
                }
                CellKind::DateTime(serial) => {
                    worksheet.write_number_with_format(row_num, col_num, serial, &datetime_format)?;
                }
                CellKind::Duration(serial) => {
                    worksheet.write_number_with_format(row_num, col_num, serial, &duration_format)?;
                }
            }
        }
    }
    Ok(workbook.save_to_buffer()?)
}

fn xlsx_row(row: usize) -> Result<u32, DatasetError> {
    u32::try_from(row).map_err(|_| DatasetError::TooLarge(format!("row {row}")))
}

fn xlsx_col(col: usize) -> Result<u16, DatasetError> {
    u16::try_from(col).map_err(|_| DatasetError::TooLarge(format!("column {col}")))
}
