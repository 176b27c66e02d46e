//! Spreadsheet rows ↔ records.
//!
//! A [`Table`] is a header row plus data rows. Converting to records drops
//! header cells that are not identifiers and leaves blank cells out of the
//! record; converting back fills absent values with blank cells.

use std::collections::HashSet;

use tracing::warn;

use crate::error::{Error, Result};
use crate::model::{ModelSchema, Record, Value, ValueKind};
use crate::validate::is_identifier;

/// Header plus rows of cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Spreadsheet row number (1-based, header is row 1) of data row `index`.
    #[must_use]
    pub const fn row_number(index: usize) -> usize {
        index + 2
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Convert rows into records, one per data row.
///
/// Returns the records and the header cells that were dropped.
#[must_use]
pub fn rows_to_records(table: &Table) -> (Vec<Record>, Vec<String>) {
    let mut dropped = Vec::new();
    let columns: Vec<Option<&str>> = table
        .header
        .iter()
        .map(|name| {
            if is_identifier(name) {
                Some(name.as_str())
            } else {
                if !name.trim().is_empty() {
                    dropped.push(name.clone());
                }
                None
            }
        })
        .collect();

    if !dropped.is_empty() {
        warn!(columns = ?dropped, "ignoring invalid header names");
    }

    let records = table
        .rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .zip(row)
                .filter_map(|(column, cell)| match column {
                    Some(name) if !is_blank(cell) => Some(((*name).to_string(), cell.clone())),
                    _ => None,
                })
                .collect()
        })
        .collect();

    (records, dropped)
}

/// Convert records into rows. The header lists every field in first-seen order.
#[must_use]
pub fn records_to_rows(records: &[Record]) -> Table {
    records_to_rows_seeded(records, &[])
}

/// Like [`records_to_rows`], with `leading` fields placed first even when no
/// record carries them.
#[must_use]
pub fn records_to_rows_seeded(records: &[Record], leading: &[&str]) -> Table {
    let mut header: Vec<String> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let names = leading
        .iter()
        .copied()
        .chain(records.iter().flat_map(Record::keys));
    for name in names {
        if seen.insert(name) {
            header.push(name.to_string());
        }
    }

    let rows = records
        .iter()
        .map(|record| {
            header
                .iter()
                .map(|field| record.get(field).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    Table { header, rows }
}

/// Restrict `record` to `schema`'s fields and type its cells.
///
/// `row` is the spreadsheet row number used in errors.
///
/// # Errors
///
/// Returns `InvalidCell` if a cell cannot be read as its field's kind.
pub fn coerce_to_schema(record: &Record, schema: &ModelSchema, row: usize) -> Result<Record> {
    let mut out = Record::new();
    for (name, value) in record.iter() {
        let Some(field) = schema.field(name) else {
            continue;
        };
        let coerced = coerce(value, field.kind).ok_or_else(|| Error::InvalidCell {
            row,
            field: name.to_string(),
            expected: field.kind.describe(),
            value: value.to_text().unwrap_or_default(),
        })?;
        out.insert(name, coerced);
    }
    Ok(out)
}

/// Header cells of `table` that name no field of `schema`.
#[must_use]
pub fn unknown_columns(header: &[String], schema: &ModelSchema) -> Vec<String> {
    header
        .iter()
        .filter(|name| is_identifier(name) && schema.field(name).is_none())
        .cloned()
        .collect()
}

fn coerce(value: &Value, kind: ValueKind) -> Option<Value> {
    if value.is_null() {
        return Some(Value::Null);
    }

    match kind {
        ValueKind::Text => match value {
            Value::String(_) => Some(value.clone()),
            other => other.to_text().map(Value::String),
        },
        ValueKind::Integer => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(value.clone()),
            Value::Number(n) => n.as_f64().and_then(integral).map(Value::from),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(integral))
                    .map(Value::from)
            }
            Value::Bool(_) | Value::Null => None,
        },
        ValueKind::Float => match value {
            Value::Number(_) => Some(value.clone()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            Value::Bool(_) | Value::Null => None,
        },
        ValueKind::Boolean => match value {
            Value::Bool(_) => Some(value.clone()),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(Value::Bool(true)),
                Some(0) => Some(Value::Bool(false)),
                _ => None,
            },
            Value::Null => None,
        },
    }
}

#[allow(clippy::cast_possible_truncation)]
fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15).then(|| f as i64)
}
