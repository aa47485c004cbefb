//! Readers for the rated (CSV) and raw (line-delimited JSON) sources.

use crate::eval::EvaluationRecord;
use crate::error::{RagbenchError, Result};
use serde_json::Value as JsonValue;
use std::path::Path;

/// Read a header-bearing CSV of evaluation records.
///
/// Columns are matched by name; missing columns and empty cells become `None`.
/// Rows that cannot be decoded are skipped with a warning.
pub fn read_rated_csv(path: &Path) -> Result<Vec<EvaluationRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut records = Vec::new();
    for (idx, row) in rdr.deserialize::<EvaluationRecord>().enumerate() {
        match row {
            Ok(record) => records.push(record),
            Err(e) => {
                let err = RagbenchError::RecordParse {
                    location: format!("{} row {}", path.display(), idx + 1),
                    message: e.to_string(),
                };
                log::warn!("{}; row skipped", err);
            }
        }
    }
    Ok(records)
}

/// Read one JSON value per non-blank line, skipping malformed lines with a warning.
pub fn read_json_lines(path: &Path) -> Result<Vec<JsonValue>> {
    let bytes = std::fs::read(path)?;
    Ok(parse_json_lines(path, &bytes))
}

/// Parse line-delimited JSON from raw bytes.
///
/// Each line is decoded on its own, so invalid UTF-8 or bad JSON costs only that line.
fn parse_json_lines(path: &Path, bytes: &[u8]) -> Vec<JsonValue> {
    let mut values = Vec::new();
    for (idx, raw) in bytes.split(|b| *b == b'\n').enumerate() {
        let parsed = std::str::from_utf8(raw)
            .map_err(|e| e.to_string())
            .and_then(|line| {
                let line = line.trim();
                if line.is_empty() {
                    return Ok(None);
                }
                serde_json::from_str::<JsonValue>(line)
                    .map(Some)
                    .map_err(|e| e.to_string())
            });
        match parsed {
            Ok(Some(value)) => values.push(value),
            Ok(None) => {}
            Err(message) => {
                let err = RagbenchError::RecordParse {
                    location: format!("{} line {}", path.display(), idx + 1),
                    message,
                };
                log::warn!("{}; line skipped", err);
            }
        }
    }
    values
}

/// Read a structured source as evaluation records.
///
/// Accepts line-delimited JSON, or a single top-level JSON array.
pub fn read_structured(path: &Path) -> Result<Vec<EvaluationRecord>> {
    let bytes = std::fs::read(path)?;
    let values = match parse_json_array(&bytes) {
        Some(values) => values,
        None => parse_json_lines(path, &bytes),
    };

    let mut records = Vec::with_capacity(values.len());
    for (idx, value) in values.iter().enumerate() {
        match EvaluationRecord::from_json_value(value) {
            Ok(record) => records.push(record),
            Err(e) => log::warn!("{} entry {}: {}; skipped", path.display(), idx + 1, e),
        }
    }
    Ok(records)
}

fn parse_json_array(bytes: &[u8]) -> Option<Vec<JsonValue>> {
    let first = bytes.iter().find(|b| !b.is_ascii_whitespace())?;
    if *first != b'[' {
        return None;
    }
    serde_json::from_slice::<Vec<JsonValue>>(bytes).ok()
}
