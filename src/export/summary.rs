//! Grouped summary statistics over exported records.

use crate::error::{RagbenchError, Result};
use chrono::NaiveDate;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

pub type JsonRecord = Map<String, JsonValue>;

/// count/mean/std/min/max/median for one numeric field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1); 0.0 below two samples.
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

impl FieldStats {
    /// `None` when there are no values.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len();
        let mean = values.iter().sum::<f64>() / n as f64;
        let std = if n < 2 {
            0.0
        } else {
            let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            variance.sqrt()
        };

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        };

        Some(Self {
            count: n,
            mean,
            std,
            min: sorted[0],
            max: sorted[n - 1],
            median,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub key: String,
    /// Records in this group.
    pub records: usize,
    /// One entry per field in `SummaryTable::fields`.
    pub stats: Vec<Option<FieldStats>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTable {
    pub group: String,
    pub fields: Vec<String>,
    /// Sorted by group key.
    pub rows: Vec<SummaryRow>,
}

/// Numeric view of a JSON value: numbers and numeric strings.
pub fn numeric(value: &JsonValue) -> Option<f64> {
    let parsed = match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Text view of a JSON value used as a group key; null and containers have none.
fn key_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Day of a record, from the leading `YYYY-MM-DD` of its `timestamp`.
pub fn record_day(record: &JsonRecord) -> Option<NaiveDate> {
    let ts = record.get("timestamp")?.as_str()?;
    let day = ts.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn summarize<'a>(
    group: &str,
    fields: &[&str],
    keyed: impl Iterator<Item = (String, &'a JsonRecord)>,
) -> SummaryTable {
    let mut groups: BTreeMap<String, Vec<&JsonRecord>> = BTreeMap::new();
    for (key, record) in keyed {
        groups.entry(key).or_default().push(record);
    }

    let rows = groups
        .into_iter()
        .map(|(key, members)| {
            let stats = fields
                .iter()
                .map(|field| {
                    let values: Vec<f64> = members
                        .iter()
                        .filter_map(|r| r.get(*field).and_then(numeric))
                        .collect();
                    FieldStats::from_values(&values)
                })
                .collect();
            SummaryRow {
                key,
                records: members.len(),
                stats,
            }
        })
        .collect();

    SummaryTable {
        group: group.to_string(),
        fields: fields.iter().map(|f| f.to_string()).collect(),
        rows,
    }
}

/// Summary grouped by the value of `group`.
///
/// Records without a usable key are left out. Fails with `MissingCapability`
/// when no record carries the column at all.
pub fn group_by_column(records: &[JsonRecord], group: &str, fields: &[&str]) -> Result<SummaryTable> {
    if !records.iter().any(|r| r.contains_key(group)) {
        return Err(RagbenchError::MissingCapability(format!(
            "cannot group by '{}': column not present in any record",
            group
        )));
    }
    let keyed = records
        .iter()
        .filter_map(|r| r.get(group).and_then(key_text).map(|k| (k, r)));
    Ok(summarize(group, fields, keyed))
}

/// Summary grouped by calendar day of `timestamp`.
pub fn group_by_day(records: &[JsonRecord], fields: &[&str]) -> Result<SummaryTable> {
    let keyed: Vec<(String, &JsonRecord)> = records
        .iter()
        .filter_map(|r| record_day(r).map(|d| (d.format("%Y-%m-%d").to_string(), r)))
        .collect();
    if keyed.is_empty() {
        return Err(RagbenchError::MissingCapability(
            "cannot group by day: no record has a parsable timestamp".to_string(),
        ));
    }
    Ok(summarize("date", fields, keyed.into_iter()))
}

/// Console table in the style of the query statistics printout.
pub fn render_table(table: &SummaryTable) -> String {
    let mut lines = Vec::new();
    let rule = format!("{:-<80}", "");
    lines.push(rule.clone());
    lines.push(format!(
        "{:<20} {:<16} {:>8} {:>10} {:>10} {:>10} {:>10}",
        table.group, "Field", "Count", "Mean", "Std", "Median", "Max"
    ));
    lines.push(rule.clone());
    for row in &table.rows {
        for (field, stats) in table.fields.iter().zip(&row.stats) {
            let Some(s) = stats else {
                continue;
            };
            lines.push(format!(
                "{:<20} {:<16} {:>8} {:>10.2} {:>10.2} {:>10.2} {:>10.2}",
                row.key, field, s.count, s.mean, s.std, s.median, s.max
            ));
        }
    }
    lines.push(rule);
    lines.join("\n")
}
