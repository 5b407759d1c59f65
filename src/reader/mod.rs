//! Tabular source reader.
//!
//! Decodes one worksheet of a spreadsheet into a finite, non-restartable
//! sequence of header-tagged row batches. The first batch carries the
//! detected header names only; every later batch carries rows keyed by
//! header name. Consumers pull one batch at a time, so nothing runs
//! ahead of the persistence work downstream.
//!
//! Cell normalization:
//! - formatted/rich payloads collapse to their textual result
//! - a formula cell without a cached result decodes as absent
//! - blank strings decode as absent
//! - an optional per-column [`TypeHint`] (serial-date decoding) applies
//!   before generic normalization
//! - rows whose values are all absent are dropped
//!
//! Plain delimited-text files go through [`lines::LineReader`] instead;
//! that mode yields raw line batches and is not used by the graph core.

pub mod lines;

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDate;
use thiserror::Error;

/// Error type for source readers.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The requested sheet is absent or yields zero batches.
    #[error("sheet {sheet:?} not found or empty in file: {path}")]
    SourceNotFound {
        /// Requested sheet name.
        sheet: String,
        /// Source file path.
        path: PathBuf,
    },
    /// The workbook could not be decoded.
    #[error("workbook error: {0}")]
    Workbook(#[from] calamine::Error),
    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-column decoding hint, applied before generic normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeHint {
    /// Decode a numeric cell as an Excel serial date.
    SerialDate,
}

/// Options for opening one worksheet.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Target sheet name; matched case-insensitively after trimming.
    pub sheet_name: String,
    /// Rows per emitted batch.
    pub batch_size: usize,
    /// 1-based index of the header row.
    pub header_row_index: usize,
    /// Column-name keyed decoding hints.
    pub type_hints: HashMap<String, TypeHint>,
}

impl ReadOptions {
    /// Options for the named sheet with default batching.
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            batch_size: 200,
            header_row_index: 1,
            type_hints: HashMap::new(),
        }
    }

    /// Attach a decoding hint for one column.
    pub fn with_hint(mut self, column: impl Into<String>, hint: TypeHint) -> Self {
        self.type_hints.insert(column.into(), hint);
        self
    }
}

/// A normalized cell value. Absent values are not represented; a row
/// simply has no entry for that column.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Trimmed, non-empty text.
    Text(String),
    /// Numeric cell.
    Number(f64),
    /// Boolean cell.
    Bool(bool),
    /// Date cell (native or hint-decoded serial).
    Date(NaiveDate),
}

/// One row keyed by header name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(HashMap<String, CellValue>);

impl Row {
    /// Empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value under a column name (mainly for tests and
    /// in-memory sources).
    pub fn insert(&mut self, column: impl Into<String>, value: CellValue) {
        self.0.insert(column.into(), value);
    }

    /// Build a row from column/value pairs.
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, CellValue)>,
        K: Into<String>,
    {
        let mut row = Self::new();
        for (k, v) in pairs {
            row.insert(k, v);
        }
        row
    }

    /// Raw value of a column.
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.0.get(column)
    }

    /// Column value rendered as trimmed text. Numbers render without a
    /// trailing `.0` so numeric codes survive Excel's typing.
    pub fn text(&self, column: &str) -> Option<String> {
        match self.0.get(column)? {
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) => Some(render_number(*n)),
            CellValue::Bool(b) => Some(b.to_string()),
            CellValue::Date(d) => Some(d.to_string()),
        }
    }

    /// Column value as a number; numeric text parses.
    pub fn number(&self, column: &str) -> Option<f64> {
        match self.0.get(column)? {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Column value as an integer (truncating).
    pub fn integer(&self, column: &str) -> Option<i64> {
        self.number(column).map(|n| n as i64)
    }

    /// Column value as a date; ISO text parses.
    pub fn date(&self, column: &str) -> Option<NaiveDate> {
        match self.0.get(column)? {
            CellValue::Date(d) => Some(*d),
            CellValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Whether the row carries no values at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One emitted batch: headers first, rows afterwards.
#[derive(Debug, Clone, Default)]
pub struct RowBatch {
    /// Detected header names; present only on the first batch.
    pub headers: Option<Vec<String>>,
    /// Normalized rows; empty on the header batch.
    pub rows: Vec<Row>,
}

impl RowBatch {
    /// Headers-only batch.
    pub fn headers(headers: Vec<String>) -> Self {
        Self {
            headers: Some(headers),
            rows: Vec::new(),
        }
    }

    /// Rows-only batch.
    pub fn rows(rows: Vec<Row>) -> Self {
        Self {
            headers: None,
            rows,
        }
    }
}

/// A finite producer of row batches.
///
/// [`SheetReader`] is the file-backed implementation; [`StaticSource`]
/// serves callers (and tests) that already hold their rows in memory.
pub trait RowSource {
    /// Produce the next batch, or `None` when the source is drained.
    fn next_batch(&mut self) -> Result<Option<RowBatch>, ReadError>;
}

/// In-memory row source.
#[derive(Debug, Default)]
pub struct StaticSource {
    batches: VecDeque<RowBatch>,
}

impl StaticSource {
    /// Source over prepared batches.
    pub fn new(batches: Vec<RowBatch>) -> Self {
        Self {
            batches: batches.into(),
        }
    }
}

impl RowSource for StaticSource {
    fn next_batch(&mut self) -> Result<Option<RowBatch>, ReadError> {
        Ok(self.batches.pop_front())
    }
}

/// Streaming reader over one worksheet.
pub struct SheetReader {
    /// Per-column header names; `None` for blank header cells, whose
    /// columns are skipped when mapping rows.
    columns: Vec<Option<String>>,
    data: VecDeque<Vec<Data>>,
    hints: HashMap<String, TypeHint>,
    batch_size: usize,
    header_sent: bool,
}

impl SheetReader {
    /// Open one worksheet of the workbook at `path`.
    ///
    /// Fails with [`ReadError::SourceNotFound`] when the sheet is
    /// absent or holds no header row.
    pub fn open(path: &Path, options: &ReadOptions) -> Result<Self, ReadError> {
        let mut workbook = open_workbook_auto(path)?;

        let wanted = options.sheet_name.trim().to_lowercase();
        let actual = workbook
            .sheet_names()
            .iter()
            .find(|name| name.trim().to_lowercase() == wanted)
            .cloned()
            .ok_or_else(|| ReadError::SourceNotFound {
                sheet: options.sheet_name.clone(),
                path: path.to_path_buf(),
            })?;

        let range = workbook.worksheet_range(&actual)?;
        let header_offset = options.header_row_index.saturating_sub(1);

        let mut rows = range.rows().skip(header_offset);
        let header_row = rows.next().ok_or_else(|| ReadError::SourceNotFound {
            sheet: options.sheet_name.clone(),
            path: path.to_path_buf(),
        })?;

        let columns: Vec<Option<String>> = header_row
            .iter()
            .map(|cell| match normalize_cell(cell, None) {
                Some(CellValue::Text(s)) => Some(s),
                Some(CellValue::Number(n)) => Some(render_number(n)),
                _ => None,
            })
            .collect();

        let data: VecDeque<Vec<Data>> = rows.map(|r| r.to_vec()).collect();

        tracing::debug!(
            sheet = %actual,
            columns = columns.iter().flatten().count(),
            rows = data.len(),
            "opened worksheet"
        );

        Ok(Self {
            columns,
            data,
            hints: options.type_hints.clone(),
            batch_size: options.batch_size.max(1),
            header_sent: false,
        })
    }

    fn map_row(&self, cells: &[Data]) -> Row {
        let mut row = Row::new();
        for (i, cell) in cells.iter().enumerate() {
            let Some(Some(name)) = self.columns.get(i) else {
                continue;
            };
            let hint = self.hints.get(name.trim()).copied();
            if let Some(value) = normalize_cell(cell, hint) {
                row.insert(name.clone(), value);
            }
        }
        row
    }
}

impl RowSource for SheetReader {
    fn next_batch(&mut self) -> Result<Option<RowBatch>, ReadError> {
        if !self.header_sent {
            self.header_sent = true;
            let headers: Vec<String> = self.columns.iter().flatten().cloned().collect();
            return Ok(Some(RowBatch::headers(headers)));
        }

        let mut rows = Vec::new();
        while rows.len() < self.batch_size {
            let Some(cells) = self.data.pop_front() else {
                break;
            };
            let row = self.map_row(&cells);
            if !row.is_empty() {
                rows.push(row);
            }
        }

        if rows.is_empty() {
            Ok(None)
        } else {
            Ok(Some(RowBatch::rows(rows)))
        }
    }
}

/// Decode an Excel serial date. The epoch is 1899-12-30, which absorbs
/// the 1900 leap-year bug.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(chrono::Duration::days(serial.floor() as i64))
}

/// Normalize one cell. Returns `None` for absent values: empty cells,
/// error cells, unresolved formulas (no cached result) and blank
/// strings.
pub fn normalize_cell(cell: &Data, hint: Option<TypeHint>) -> Option<CellValue> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            if let Some(TypeHint::SerialDate) = hint {
                if let Ok(serial) = trimmed.parse::<f64>() {
                    if let Some(date) = serial_to_date(serial) {
                        return Some(CellValue::Date(date));
                    }
                }
                if let Ok(date) = trimmed.parse::<NaiveDate>() {
                    return Some(CellValue::Date(date));
                }
            }
            Some(CellValue::Text(trimmed.to_string()))
        }
        Data::Int(i) => match hint {
            Some(TypeHint::SerialDate) => serial_to_date(*i as f64).map(CellValue::Date),
            None => Some(CellValue::Number(*i as f64)),
        },
        Data::Float(f) => match hint {
            Some(TypeHint::SerialDate) => serial_to_date(*f).map(CellValue::Date),
            None => Some(CellValue::Number(*f)),
        },
        Data::Bool(b) => Some(CellValue::Bool(*b)),
        Data::DateTime(dt) => serial_to_date(dt.as_f64()).map(CellValue::Date),
        Data::DateTimeIso(s) | Data::DurationIso(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            if let Ok(date) = trimmed[..trimmed.len().min(10)].parse::<NaiveDate>() {
                return Some(CellValue::Date(date));
            }
            Some(CellValue::Text(trimmed.to_string()))
        }
    }
}

fn render_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_error_cells_are_absent() {
        assert_eq!(normalize_cell(&Data::Empty, None), None);
        assert_eq!(normalize_cell(&Data::String("   ".to_string()), None), None);
        assert_eq!(
            normalize_cell(&Data::Error(calamine::CellErrorType::Div0), None),
            None
        );
    }

    #[test]
    fn text_cells_trim() {
        assert_eq!(
            normalize_cell(&Data::String("  A1 ".to_string()), None),
            Some(CellValue::Text("A1".to_string()))
        );
    }

    #[test]
    fn serial_date_hint_decodes_numbers() {
        // 45000 days past 1899-12-30.
        let decoded = normalize_cell(&Data::Float(45000.0), Some(TypeHint::SerialDate));
        assert_eq!(
            decoded,
            Some(CellValue::Date(
                NaiveDate::from_ymd_opt(2023, 3, 15).unwrap()
            ))
        );
    }

    #[test]
    fn serial_epoch_matches_excel() {
        assert_eq!(serial_to_date(1.0), NaiveDate::from_ymd_opt(1899, 12, 31));
        assert_eq!(serial_to_date(60.0), NaiveDate::from_ymd_opt(1900, 2, 28));
        // Excel's phantom 1900-02-29 lands on March 1st here.
        assert_eq!(serial_to_date(61.0), NaiveDate::from_ymd_opt(1900, 3, 1));
    }

    #[test]
    fn numeric_codes_render_without_decimal_point() {
        let mut row = Row::new();
        row.insert("Code Offer 1", CellValue::Number(1234.0));
        assert_eq!(row.text("Code Offer 1").as_deref(), Some("1234"));
    }

    #[test]
    fn static_source_drains_in_order() {
        let mut source = StaticSource::new(vec![
            RowBatch::headers(vec!["A".to_string()]),
            RowBatch::rows(vec![Row::from_pairs([("A", CellValue::Number(1.0))])]),
        ]);
        assert!(source.next_batch().unwrap().unwrap().headers.is_some());
        assert_eq!(source.next_batch().unwrap().unwrap().rows.len(), 1);
        assert!(source.next_batch().unwrap().is_none());
    }
}
