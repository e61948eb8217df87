use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use crate::error::CoreError;

/// One row of an uploaded timetable: lowercased, trimmed header → cell text.
pub type Row = BTreeMap<String, String>;

/// Bytes inspected when guessing the CSV delimiter.
const SNIFF_SAMPLE_BYTES: usize = 4096;
const SNIFF_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Json,
    Xlsx,
}

impl TableFormat {
    /// Pick the parser from the file extension.
    pub fn from_path(path: &Path) -> Result<Self, CoreError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(TableFormat::Csv),
            "json" => Ok(TableFormat::Json),
            "xlsx" | "xls" => Ok(TableFormat::Xlsx),
            other => Err(CoreError::UnsupportedFormat(format!(
                "expected .csv, .json or .xlsx, got {:?}",
                if other.is_empty() { "<none>" } else { other }
            ))),
        }
    }
}

pub fn parse(path: &Path, format: TableFormat) -> Result<Vec<Row>, CoreError> {
    match format {
        TableFormat::Csv => {
            let bytes = std::fs::read(path).map_err(CoreError::parse_failed)?;
            parse_csv(&bytes)
        }
        TableFormat::Json => {
            let bytes = std::fs::read(path).map_err(CoreError::parse_failed)?;
            parse_json(&bytes)
        }
        TableFormat::Xlsx => parse_xlsx(path),
    }
}

fn normalize_header(h: &str) -> String {
    h.trim().to_lowercase()
}

/// Guess the field delimiter from the first lines of the file.
/// Returns `None` when the sample gives no usable signal.
pub fn sniff_delimiter(sample: &[u8]) -> Option<u8> {
    let text = String::from_utf8_lossy(sample);
    let mut lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    // The last line of a truncated sample is likely cut mid-record.
    if sample.len() >= SNIFF_SAMPLE_BYTES && lines.len() > 1 {
        lines.pop();
    }
    let first = *lines.first()?;

    let mut best: Option<(u8, usize, usize)> = None;
    for &delim in &SNIFF_CANDIDATES {
        let expected = first.bytes().filter(|b| *b == delim).count();
        if expected == 0 {
            continue;
        }
        let consistent = lines
            .iter()
            .filter(|l| l.bytes().filter(|b| *b == delim).count() == expected)
            .count();
        let better = match best {
            None => true,
            Some((_, c, e)) => (consistent, expected) > (c, e),
        };
        if better {
            best = Some((delim, consistent, expected));
        }
    }
    best.map(|(d, _, _)| d)
}

pub fn parse_csv(bytes: &[u8]) -> Result<Vec<Row>, CoreError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let sample = &bytes[..bytes.len().min(SNIFF_SAMPLE_BYTES)];
    let delimiter = sniff_delimiter(sample).unwrap_or(b',');

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(CoreError::parse_failed)?
        .iter()
        .map(normalize_header)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(CoreError::parse_failed)?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .filter(|(h, _)| !h.is_empty())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        if !row.is_empty() {
            rows.push(row);
        }
    }
    Ok(rows)
}

fn value_to_cell(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn object_to_row(map: &serde_json::Map<String, Value>) -> Row {
    map.iter()
        .map(|(k, v)| (normalize_header(k), value_to_cell(v)))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

/// Accepts `{"2024-03-01": {..row..}, ...}`, `[{"date": ..., ...}, ...]`,
/// or a single bare row object.
pub fn parse_json(bytes: &[u8]) -> Result<Vec<Row>, CoreError> {
    let doc: Value = serde_json::from_slice(bytes).map_err(CoreError::parse_failed)?;
    match doc {
        Value::Object(map) => {
            let keyed: Vec<Row> = map
                .iter()
                .filter_map(|(date, v)| {
                    let mut row = object_to_row(v.as_object()?);
                    row.entry("date".into()).or_insert_with(|| date.trim().to_string());
                    Some(row)
                })
                .collect();
            if keyed.is_empty() {
                Ok(vec![object_to_row(&map)])
            } else {
                Ok(keyed)
            }
        }
        Value::Array(items) => Ok(items
            .iter()
            .filter_map(|v| v.as_object().map(object_to_row))
            .collect()),
        _ => Err(CoreError::ParseFailed(
            "JSON timetable must be an object keyed by date or a list of rows".into(),
        )),
    }
}

#[cfg(feature = "xlsx")]
fn parse_xlsx(path: &Path) -> Result<Vec<Row>, CoreError> {
    use calamine::{open_workbook_auto, Reader};

    let mut workbook = open_workbook_auto(path).map_err(CoreError::parse_failed)?;
    let range = match workbook.worksheet_range_at(0) {
        Some(r) => r.map_err(CoreError::parse_failed)?,
        None => return Ok(Vec::new()),
    };

    let mut sheet_rows = range.rows();
    let headers: Vec<String> = match sheet_rows.next() {
        Some(h) => h.iter().map(|c| normalize_header(&xlsx::cell_to_string(c))).collect(),
        None => return Ok(Vec::new()),
    };

    let rows = sheet_rows
        .map(|cells| {
            headers
                .iter()
                .zip(cells.iter())
                .filter(|(h, _)| !h.is_empty())
                .map(|(h, c)| (h.clone(), xlsx::cell_to_string(c)))
                .collect::<Row>()
        })
        .filter(|row| row.values().any(|v| !v.is_empty()))
        .collect();
    Ok(rows)
}

#[cfg(not(feature = "xlsx"))]
fn parse_xlsx(_path: &Path) -> Result<Vec<Row>, CoreError> {
    Err(CoreError::UnsupportedFormat(
        "spreadsheet support is not compiled in (enable the `xlsx` feature)".into(),
    ))
}

#[cfg(feature = "xlsx")]
mod xlsx {
    use calamine::{Data, ExcelDateTime};
    use chrono::NaiveTime;

    pub fn cell_to_string(cell: &Data) -> String {
        match cell {
            Data::Empty | Data::Error(_) => String::new(),
            Data::String(s) => s.trim().to_string(),
            Data::Int(i) => i.to_string(),
            Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
            Data::Float(f) => f.to_string(),
            Data::Bool(b) => b.to_string(),
            Data::DateTime(dt) => datetime_to_string(dt),
            Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        }
    }

    // Time-only cells have a serial below one day.
    fn datetime_to_string(dt: &ExcelDateTime) -> String {
        let serial = dt.as_f64();
        match dt.as_datetime() {
            Some(ndt) if serial < 1.0 => ndt.format("%H:%M:%S").to_string(),
            Some(ndt) if ndt.time() == NaiveTime::MIN => ndt.format("%Y-%m-%d").to_string(),
            Some(ndt) => ndt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => serial.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_common_delimiters() {
        assert_eq!(sniff_delimiter(b"date;fajr;dhuhr\n2024-03-01;6:15;12:30\n"), Some(b';'));
        assert_eq!(sniff_delimiter(b"date\tfajr\n2024-03-01\t6:15\n"), Some(b'\t'));
        assert_eq!(sniff_delimiter(b"date,fajr\n2024-03-01,6:15\n"), Some(b','));
        assert_eq!(sniff_delimiter(b""), None);
        assert_eq!(sniff_delimiter(b"date\n2024-03-01\n"), None);
    }

    #[test]
    fn csv_headers_are_lowercased_and_trimmed() {
        let rows = parse_csv(b" Date , FAJR ,Dhuhr\n2024-03-01, 6:15 ,12:30\n").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["date"], "2024-03-01");
        assert_eq!(rows[0]["fajr"], "6:15");
        assert_eq!(rows[0]["dhuhr"], "12:30");
    }

    #[test]
    fn csv_with_semicolons_and_bom() {
        let rows = parse_csv("\u{feff}date;fajr\n2024-03-01;0615\n2024-03-02;0616\n".as_bytes())
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["fajr"], "0616");
    }

    #[test]
    fn empty_csv_defaults_to_comma_and_yields_no_rows() {
        assert!(parse_csv(b"").unwrap().is_empty());
    }

    #[test]
    fn json_keyed_by_date() {
        let rows = parse_json(
            br#"{"2024-03-01": {"Fajr": "6:15"}, "2024-03-02": {"fajr": 616, "date": "2024-03-02"}}"#,
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        let first = rows.iter().find(|r| r["date"] == "2024-03-01").unwrap();
        assert_eq!(first["fajr"], "6:15");
        let second = rows.iter().find(|r| r["date"] == "2024-03-02").unwrap();
        assert_eq!(second["fajr"], "616");
    }

    #[test]
    fn json_list_of_rows() {
        let rows = parse_json(br#"[{"date": "2024-03-01", "isha": null}, 5, {"date": "2024-03-02"}]"#)
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["isha"], "");
    }

    #[test]
    fn json_bare_row_object() {
        let rows = parse_json(br#"{"date": "2024-03-01", "fajr": "5:30"}"#).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["fajr"], "5:30");
    }

    #[test]
    fn corrupt_json_is_a_parse_failure() {
        assert!(matches!(parse_json(b"{oops"), Err(CoreError::ParseFailed(_))));
        assert!(matches!(parse_json(b"42"), Err(CoreError::ParseFailed(_))));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(TableFormat::from_path(Path::new("t_1.CSV")).unwrap(), TableFormat::Csv);
        assert_eq!(TableFormat::from_path(Path::new("t.xlsx")).unwrap(), TableFormat::Xlsx);
        assert_eq!(TableFormat::from_path(Path::new("t.json")).unwrap(), TableFormat::Json);
        assert!(matches!(
            TableFormat::from_path(Path::new("poster.png")),
            Err(CoreError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            TableFormat::from_path(Path::new("noext")),
            Err(CoreError::UnsupportedFormat(_))
        ));
    }

    #[cfg(feature = "xlsx")]
    #[test]
    fn corrupt_xlsx_is_a_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"definitely not a zip").unwrap();
        assert!(matches!(parse(&path, TableFormat::Xlsx), Err(CoreError::ParseFailed(_))));
    }

    #[cfg(feature = "xlsx")]
    #[test]
    fn xlsx_reads_first_sheet_only() {
        use rust_xlsxwriter::Workbook;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timetable.xlsx");
        let mut workbook = Workbook::new();

        let sheet = workbook.add_worksheet();
        for (col, header) in [(0, " Date "), (1, "FAJR"), (3, "Dhuhr"), (4, "Isha")] {
            sheet.write_string(0, col, header).unwrap();
        }
        sheet.write_string(1, 0, "2024-03-01").unwrap();
        sheet.write_string(1, 1, "6:15").unwrap();
        sheet.write_string(1, 2, "staff note").unwrap();
        sheet.write_number(1, 3, 1230.0).unwrap();
        sheet.write_string(3, 0, "2024-03-02").unwrap();
        sheet.write_string(3, 1, "6:13").unwrap();
        sheet.write_number(3, 3, 1230.0).unwrap();
        sheet.write_string(3, 4, "20:05").unwrap();

        let other = workbook.add_worksheet();
        other.write_string(0, 0, "date").unwrap();
        other.write_string(1, 0, "2099-01-01").unwrap();

        workbook.save(&path).unwrap();

        let row = |pairs: &[(&str, &str)]| -> Row {
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
        };
        let rows = parse(&path, TableFormat::from_path(&path).unwrap()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            row(&[("date", "2024-03-01"), ("fajr", "6:15"), ("dhuhr", "1230"), ("isha", "")])
        );
        assert_eq!(rows[1]["isha"], "20:05");
        assert!(rows.iter().all(|r| r["date"] != "2099-01-01"));
    }

    #[cfg(feature = "xlsx")]
    #[test]
    fn xlsx_cells_stringify() {
        use calamine::Data;
        assert_eq!(xlsx::cell_to_string(&Data::Float(615.0)), "615");
        assert_eq!(xlsx::cell_to_string(&Data::Float(6.15)), "6.15");
        assert_eq!(xlsx::cell_to_string(&Data::Empty), "");
        assert_eq!(xlsx::cell_to_string(&Data::String(" 6:15 ".into())), "6:15");
    }
}
