use crate::error::Result;
use crate::export::summary::{JsonRecord, SummaryTable};
use serde_json::Value as JsonValue;
use std::path::Path;

const STAT_COLUMNS: [&str; 6] = ["count", "mean", "std", "min", "max", "median"];

fn cell(value: Option<&JsonValue>) -> String {
    match value {
        None | Some(JsonValue::Null) => String::new(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Union of keys across records, in first-seen order.
pub fn columns(records: &[JsonRecord]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

/// Write the concatenated records verbatim as CSV.
pub fn write_raw_csv(records: &[JsonRecord], path: &Path) -> Result<()> {
    let columns = columns(records);
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(&columns)?;
    for record in records {
        wtr.write_record(columns.iter().map(|c| cell(record.get(c))))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write a grouped summary as CSV: `<group>, records, <field>_<stat>...`.
pub fn write_summary_csv(table: &SummaryTable, path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    let mut header = vec![table.group.clone(), "records".to_string()];
    for field in &table.fields {
        header.extend(STAT_COLUMNS.iter().map(|stat| format!("{}_{}", field, stat)));
    }
    wtr.write_record(&header)?;

    for row in &table.rows {
        let mut out = vec![row.key.clone(), row.records.to_string()];
        for stats in &row.stats {
            match stats {
                Some(s) => out.extend([
                    s.count.to_string(),
                    s.mean.to_string(),
                    s.std.to_string(),
                    s.min.to_string(),
                    s.max.to_string(),
                    s.median.to_string(),
                ]),
                None => out.extend(std::iter::repeat(String::new()).take(STAT_COLUMNS.len())),
            }
        }
        wtr.write_record(&out)?;
    }
    wtr.flush()?;
    Ok(())
}
