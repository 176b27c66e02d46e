//! Spreadsheet files.
//!
//! The format follows the file extension:
//!
//! - `.csv`: first row is the header, rows may be ragged, blank cells read as
//!   null and every other cell as text
//! - `.xlsx` (also `.xlsm`, `.xlsb`, `.xls`, `.ods` for reading): the first
//!   worksheet, with cells keeping their workbook type
//!
//! Writes are atomic (temp file, fsync, rename); null writes as an empty cell.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::Workbook;

use crate::error::{Error, Result};
use crate::model::Value;
use crate::sync::tabular::Table;

const UTF8_BOM: &str = "\u{feff}";

/// Longest worksheet name a workbook accepts.
const MAX_SHEET_NAME: usize = 31;

/// Spreadsheet file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    /// Office Open XML workbook; the only workbook format written.
    Xlsx,
    /// Other workbook formats, read only.
    LegacyWorkbook,
}

impl Format {
    /// Format named by `path`'s extension.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a missing or unknown extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("xlsx") => Ok(Self::Xlsx),
            Some("xlsm" | "xlsb" | "xls" | "ods") => Ok(Self::LegacyWorkbook),
            _ => Err(Error::InvalidArgument(format!(
                "Unsupported spreadsheet format: {} (use .xlsx or .csv)",
                path.display()
            ))),
        }
    }
}

/// Read a spreadsheet file into a [`Table`].
///
/// # Errors
///
/// Returns `InvalidArgument` if the file does not exist or has an unknown
/// extension, or a CSV/workbook error if it cannot be parsed.
pub fn read_table(path: &Path) -> Result<Table> {
    let format = Format::from_path(path)?;
    if !path.exists() {
        return Err(Error::InvalidArgument(format!(
            "Spreadsheet not found: {}",
            path.display()
        )));
    }

    match format {
        Format::Csv => read_csv(path),
        Format::Xlsx | Format::LegacyWorkbook => read_workbook(path),
    }
}

/// Write `table` to `path`. Workbooks get one worksheet named `sheet`.
///
/// # Errors
///
/// Returns `InvalidArgument` for an extension that cannot be written, or an
/// error if the file cannot be written.
pub fn write_table(path: &Path, table: &Table, sheet: &str) -> Result<()> {
    let content = match Format::from_path(path)? {
        Format::Csv => csv_bytes(table)?,
        Format::Xlsx => xlsx_bytes(table, sheet)?,
        Format::LegacyWorkbook => {
            return Err(Error::InvalidArgument(format!(
                "Cannot write {}: only .xlsx and .csv are written",
                path.display()
            )));
        }
    };
    atomic_write(path, &content)
}

/// Write `content` to `path` atomically.
///
/// The content goes to a sibling temp file, is synced to disk, then renamed
/// over `path`. If any step fails the original file is untouched.
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let temp_path = temp_path(path);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(content)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

// ── CSV ──────────────────────────────────────────────────────

fn read_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = reader.records();
    let header = match rows.next() {
        Some(first) => first?
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let cell = if i == 0 { cell.trim_start_matches(UTF8_BOM) } else { cell };
                cell.trim().to_string()
            })
            .collect(),
        None => return Ok(Table::default()),
    };

    let rows = rows
        .map(|row| {
            row.map(|cells| {
                cells
                    .iter()
                    .map(|cell| {
                        if cell.is_empty() {
                            Value::Null
                        } else {
                            Value::String(cell.to_string())
                        }
                    })
                    .collect()
            })
        })
        .collect::<std::result::Result<Vec<Vec<Value>>, csv::Error>>()?;

    Ok(Table { header, rows })
}

fn csv_bytes(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    writer.write_record(&table.header)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|v| v.to_text().unwrap_or_default()))?;
    }

    writer.into_inner().map_err(|e| Error::Io(e.into_error()))
}

// ── Workbooks ────────────────────────────────────────────────

fn read_workbook(path: &Path) -> Result<Table> {
    let mut workbook = open_workbook_auto(path)?;
    let Some(range) = workbook.worksheet_range_at(0) else {
        return Ok(Table::default());
    };
    let range = range?;

    let mut rows = range.rows();
    let header = match rows.next() {
        Some(cells) => cells.iter().map(header_text).collect(),
        None => return Ok(Table::default()),
    };
    let rows = rows
        .map(|cells| cells.iter().map(cell_value).collect())
        .collect();

    Ok(Table { header, rows })
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => cell_value(other).to_text().unwrap_or_default(),
    }
}

/// Workbooks store every number as a float; integral ones read as integers.
#[allow(clippy::cast_possible_truncation)]
fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) if s.is_empty() => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Bool(b) => Value::Bool(*b),
        Data::Int(n) => Value::from(*n),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Value::from(*f as i64),
        Data::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
        other => Value::String(other.to_string()),
    }
}

fn xlsx_bytes(table: &Table, sheet: &str) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet.chars().take(MAX_SHEET_NAME).collect::<String>())?;

    for (col, name) in table.header.iter().enumerate() {
        worksheet.write_string(0, column(col)?, name)?;
    }
    for (index, row) in table.rows.iter().enumerate() {
        let row_index = u32::try_from(index + 1)
            .map_err(|_| Error::InvalidArgument("Too many rows for a workbook".into()))?;
        for (col, value) in row.iter().enumerate() {
            let col = column(col)?;
            match value {
                Value::Null => {}
                Value::Bool(b) => {
                    worksheet.write_boolean(row_index, col, *b)?;
                }
                // Beyond 2^53 a float cell would round the integer.
                Value::Number(n) if n.as_i64().is_some_and(|i| i.unsigned_abs() > 1 << 53) => {
                    worksheet.write_string(row_index, col, n.to_string())?;
                }
                Value::Number(n) => match n.as_f64() {
                    Some(f) => {
                        worksheet.write_number(row_index, col, f)?;
                    }
                    None => {
                        worksheet.write_string(row_index, col, n.to_string())?;
                    }
                },
                Value::String(s) => {
                    worksheet.write_string(row_index, col, s)?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn column(index: usize) -> Result<u16> {
    u16::try_from(index).map_err(|_| Error::InvalidArgument("Too many columns for a workbook".into()))
}
