use std::io::Cursor;

use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
use serde::Deserialize;
use serde_json::{Map, Number, Value};

use crate::error::AppError;
use crate::import::normalize::ImportRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Xlsx,
    Json,
}

impl FileFormat {
    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Xlsx => "xlsx",
            FileFormat::Json => "json",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            FileFormat::Csv => "text/csv",
            FileFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            FileFormat::Json => "application/json",
        }
    }
}

/// Parses a whole file into raw rows. Any malformed input aborts the import.
pub fn parse_rows(format: FileFormat, bytes: &[u8]) -> Result<Vec<ImportRow>, AppError> {
    match format {
        FileFormat::Csv => parse_csv(bytes),
        FileFormat::Xlsx => parse_xlsx(bytes),
        FileFormat::Json => parse_json(bytes),
    }
}

fn parse_csv(bytes: &[u8]) -> Result<Vec<ImportRow>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| AppError::Parse(e.to_string()))?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| AppError::Parse(e.to_string()))?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        let row: ImportRow = headers
            .iter()
            .zip(record.iter())
            .map(|(header, field)| (header.to_string(), Value::String(field.to_string())))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

fn parse_xlsx(bytes: &[u8]) -> Result<Vec<ImportRow>, AppError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
        .map_err(|e| AppError::Parse(format!("not a readable xlsx workbook: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::Parse("workbook has no sheets".to_string()))?
        .map_err(|e| AppError::Parse(e.to_string()))?;

    let mut sheet_rows = range.rows();
    let headers: Vec<String> = match sheet_rows.next() {
        Some(header_row) => header_row.iter().map(|cell| cell.to_string()).collect(),
        None => return Ok(Vec::new()),
    };

    let mut rows = Vec::new();
    for cells in sheet_rows {
        if cells.iter().all(|cell| matches!(cell, Data::Empty)) {
            continue;
        }

        let row: ImportRow = headers
            .iter()
            .zip(cells.iter())
            .filter(|(header, _)| !header.trim().is_empty())
            .map(|(header, cell)| (header.clone(), cell_value(cell)))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::String(String::new()),
        Data::String(s) => Value::String(s.clone()),
        Data::Bool(b) => Value::Bool(*b),
        Data::Int(i) => Value::Number((*i).into()),
        // Whole-number floats come back as integers so "60" stays "60".
        Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            Value::Number((*f as i64).into())
        }
        Data::Float(f) => Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(f.to_string())),
        other => Value::String(other.to_string()),
    }
}

fn parse_json(bytes: &[u8]) -> Result<Vec<ImportRow>, AppError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| AppError::Parse(e.to_string()))?;

    let Value::Array(items) = value else {
        return Err(AppError::Parse("expected a top-level array of objects".to_string()));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => Ok(map),
            _ => Err(AppError::Parse(format!("element {} is not an object", index))),
        })
        .collect::<Result<Vec<Map<String, Value>>, _>>()
}
