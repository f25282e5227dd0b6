//! Row extraction for spreadsheet and CSV uploads.
//!
//! Tabular chunking is CPU-bound and happens locally: the first row is taken
//! as the header, and every following data row becomes one chunk whose text
//! reads `"Row {i}: col: val, ..."`. Original cell values are retained as
//! chunk metadata so the store keeps the typed row alongside the synthesized
//! text. Callers run [`extract_rows`] under `spawn_blocking`.

use crate::pipeline::types::Chunk;
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use serde_json::{Map, Value};
use std::io::Cursor;
use thiserror::Error;

/// Tabular input flavors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TabularFormat {
    /// Excel-style workbook; the first sheet is read.
    Workbook,
    /// Comma-delimited text with a header row.
    Delimited,
}

/// Errors produced while turning tabular bytes into rows.
#[derive(Debug, Error)]
pub enum TabularError {
    /// Workbook container could not be opened or read.
    #[error("Failed to read workbook: {0}")]
    Workbook(String),
    /// Delimited input could not be parsed.
    #[error("Failed to read delimited input: {0}")]
    Delimited(#[from] csv::Error),
}

/// Parse `bytes` into one chunk per data row.
pub fn extract_rows(format: TabularFormat, bytes: &[u8]) -> Result<Vec<Chunk>, TabularError> {
    match format {
        TabularFormat::Workbook => extract_workbook_rows(bytes),
        TabularFormat::Delimited => extract_delimited_rows(bytes),
    }
}

fn extract_workbook_rows(bytes: &[u8]) -> Result<Vec<Chunk>, TabularError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor)
        .map_err(|error| TabularError::Workbook(error.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| TabularError::Workbook("workbook contains no sheets".to_string()))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|error| TabularError::Workbook(error.to_string()))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .enumerate()
            .map(|(column, cell)| header_name(column, &cell.to_string()))
            .collect(),
        None => return Ok(Vec::new()),
    };

    let chunks = rows
        .filter(|row| !row.iter().all(|cell| matches!(cell, Data::Empty)))
        .enumerate()
        .map(|(index, row)| {
            let cells = row
                .iter()
                .map(|cell| (cell_to_value(cell), cell.to_string()))
                .collect();
            build_row_chunk(index, &headers, cells)
        })
        .collect();

    Ok(chunks)
}

fn extract_delimited_rows(bytes: &[u8]) -> Result<Vec<Chunk>, TabularError> {
    let mut reader = csv::Reader::from_reader(bytes);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(column, header)| header_name(column, header))
        .collect();

    let mut chunks = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let cells = record
            .iter()
            .map(|field| (Value::String(field.to_string()), field.to_string()))
            .collect();
        chunks.push(build_row_chunk(index, &headers, cells));
    }

    Ok(chunks)
}

/// Synthesize the chunk for one data row.
///
/// `cells` pairs each cell's JSON value with its display text, in column
/// order. Columns beyond the header row get generated names.
fn build_row_chunk(index: usize, headers: &[String], cells: Vec<(Value, String)>) -> Chunk {
    let mut original_values = Map::new();
    let mut pairs = Vec::with_capacity(cells.len());

    for (column, (value, display)) in cells.into_iter().enumerate() {
        let header = headers
            .get(column)
            .cloned()
            .unwrap_or_else(|| generated_header(column));
        pairs.push(format!("{header}: {display}"));
        original_values.insert(header, value);
    }

    Chunk {
        text: format!("Row {index}: {}", pairs.join(", ")),
        row: index,
        original_values,
    }
}

fn header_name(column: usize, raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        generated_header(column)
    } else {
        trimmed.to_string()
    }
}

fn generated_header(column: usize) -> String {
    format!("column_{column}")
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(text) => Value::String(text.clone()),
        Data::Float(value) => serde_json::Number::from_f64(*value)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(value.to_string())),
        Data::Int(value) => Value::from(*value),
        Data::Bool(value) => Value::Bool(*value),
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimited_rows_become_labelled_chunks() {
        let bytes = b"name,age\nalice,30\nbob,41\n";
        let chunks = extract_rows(TabularFormat::Delimited, bytes).expect("rows");

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "Row 0: name: alice, age: 30");
        assert_eq!(chunks[1].text, "Row 1: name: bob, age: 41");
        assert_eq!(chunks[1].row, 1);
        assert_eq!(chunks[0].original_values["name"], "alice");
        assert_eq!(chunks[0].original_values["age"], "30");
    }

    #[test]
    fn delimited_header_only_input_yields_no_chunks() {
        let bytes = b"name,age\n";
        let chunks = extract_rows(TabularFormat::Delimited, bytes).expect("rows");
        assert!(chunks.is_empty());
    }

    #[test]
    fn garbage_workbook_bytes_are_rejected() {
        let error = extract_rows(TabularFormat::Workbook, b"definitely not a workbook")
            .expect_err("invalid workbook");
        assert!(matches!(error, TabularError::Workbook(_)));
    }

    #[test]
    fn row_chunk_generates_names_for_extra_columns() {
        let headers = vec!["name".to_string()];
        let cells = vec![
            (Value::String("alice".into()), "alice".to_string()),
            (Value::from(30), "30".to_string()),
        ];
        let chunk = build_row_chunk(0, &headers, cells);
        assert_eq!(chunk.text, "Row 0: name: alice, column_1: 30");
        assert_eq!(chunk.original_values["column_1"], 30);
    }

    #[test]
    fn workbook_cells_keep_typed_values() {
        assert_eq!(cell_to_value(&Data::Int(7)), Value::from(7));
        assert_eq!(cell_to_value(&Data::Bool(true)), Value::Bool(true));
        assert_eq!(cell_to_value(&Data::Empty), Value::Null);
        assert_eq!(
            cell_to_value(&Data::String("hi".into())),
            Value::String("hi".into())
        );
        assert_eq!(cell_to_value(&Data::Float(2.5)), Value::from(2.5));
    }
}
