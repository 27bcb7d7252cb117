use std::fs;
use std::path::Path;

use labeler_core::Sentiment;
use labeler_engine::{
    encode_dataset, read_dataset, CellKind, Dataset, DatasetError, DatasetFormat,
};
use pretty_assertions::assert_eq;
use rust_xlsxwriter::{Format, Workbook};
use tempfile::TempDir;

fn survey() -> Dataset {
    Dataset::new(
        vec!["編號".into(), "意見".into(), "備註".into()],
        vec![
            vec!["1".into(), "宿舍很乾淨，室友也很好".into(), "".into()],
            vec!["2".into(), "".into(), "未填".into()],
            vec!["3".into(), "冷氣常常壞掉, 很熱".into(), "".into()],
        ],
    )
}

#[test]
fn reads_bom_prefixed_csv_with_chinese_headers() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("survey.csv");
    fs::write(&path, "\u{feff}編號,意見\n1,很好\n2,\"不好, 很吵\"\n").unwrap();

    let dataset = read_dataset(&path).unwrap();
    assert_eq!(dataset.headers().to_vec(), vec!["編號".to_string(), "意見".to_string()]);
    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.cell(1, 1), "不好, 很吵");
}

#[test]
fn reads_utf16_csv_exported_by_spreadsheet_tools() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("survey.csv");
    let mut bytes = vec![0xFF, 0xFE];
    for unit in "id,意見\n1,很好\n".encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    fs::write(&path, bytes).unwrap();

    let dataset = read_dataset(&path).unwrap();
    assert_eq!(dataset.column_index("意見"), Some(1));
    assert_eq!(dataset.cell(0, 1), "很好");
}

#[test]
fn csv_output_carries_bom_and_survives_reread() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.csv");
    let mut dataset = survey();
    let cols = dataset.reset_label_columns();
    dataset.set_label(0, cols, Sentiment::Positive);

    let bytes = encode_dataset(&dataset, DatasetFormat::Csv).unwrap();
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"));
    fs::write(&path, bytes).unwrap();

    let reread = read_dataset(&path).unwrap();
    assert_eq!(reread, dataset);
    assert_eq!(reread.labels(cols).next(), Some(("1", "正向")));
}

#[test]
fn xlsx_keeps_text_and_gaps() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.xlsx");
    let mut dataset = survey();
    let cols = dataset.reset_label_columns();
    dataset.set_label(0, cols, Sentiment::Negative);
    fs::write(&path, encode_dataset(&dataset, DatasetFormat::Xlsx).unwrap()).unwrap();

    let reread = read_dataset(&path).unwrap();
    assert_eq!(reread.headers(), dataset.headers());
    assert_eq!(reread.len(), 3);
    assert_eq!(reread.cell(0, 1), "宿舍很乾淨，室友也很好");
    assert_eq!(reread.cell(1, 1), "");
    assert_eq!(reread.cell(1, 2), "未填");
    assert_eq!(reread.label_columns(), Some(cols));
    let labels: Vec<(&str, &str)> = reread.labels(cols).collect();
    assert_eq!(labels, vec![("-1", "負向"), ("", ""), ("", "")]);
}

#[test]
fn xlsx_numbers_and_dates_keep_their_type() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("form.xlsx");
    let timestamp = 45352.427083333336;

    let mut workbook = Workbook::new();
    let date = Format::new().set_num_format("yyyy/m/d h:mm");
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "時間戳記").unwrap();
    sheet.write_string(0, 1, "編號").unwrap();
    sheet.write_string(0, 2, "意見").unwrap();
    sheet.write_number_with_format(1, 0, timestamp, &date).unwrap();
    sheet.write_number(1, 1, 7).unwrap();
    sheet.write_string(1, 2, "學餐關了好可惜").unwrap();
    workbook.save(&input).unwrap();

    let mut dataset = read_dataset(&input).unwrap();
    assert_eq!(dataset.cell_kind(0, 0), CellKind::DateTime(timestamp));
    assert_eq!(dataset.cell_kind(0, 1), CellKind::Number(7.0));
    assert_eq!(dataset.cell(0, 1), "7");

    let cols = dataset.reset_label_columns();
    dataset.set_label(0, cols, Sentiment::Negative);
    let output = dir.path().join("form_情緒分析結果.xlsx");
    fs::write(&output, encode_dataset(&dataset, DatasetFormat::Xlsx).unwrap()).unwrap();

    let reread = read_dataset(&output).unwrap();
    assert_eq!(reread.cell_kind(0, 0), CellKind::DateTime(timestamp));
    assert_eq!(reread.cell_kind(0, 1), CellKind::Number(7.0));
    assert_eq!(reread.cell_kind(0, cols.code), CellKind::Text);
    assert_eq!(reread.cell(0, cols.code), "-1");
    assert_eq!(reread.cell(0, 2), "學餐關了好可惜");
}

#[test]
fn unsupported_extension_is_rejected() {
    let err = read_dataset(Path::new("notes.txt")).unwrap_err();
    assert!(matches!(err, DatasetError::UnsupportedFormat(_)));
}
