//! Per-query evaluation record and field-level parsing.

use crate::error::{RagbenchError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One row per query-method pair, as produced by the test harness.
///
/// Cells are kept as raw text so that each metric can decide independently
/// whether the value is usable. Missing columns and empty cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    #[serde(default)]
    pub query_id: Option<String>,
    #[serde(default)]
    pub precision_at_5: Option<String>,
    #[serde(default)]
    pub overall_precision: Option<String>,
    #[serde(default)]
    pub mrr: Option<String>,
    #[serde(default)]
    pub success: Option<String>,
    #[serde(default)]
    pub results_count: Option<String>,
}

impl EvaluationRecord {
    /// Build a record from one structured (JSON) object.
    ///
    /// Numbers and booleans are rendered to text so JSON and CSV sources go
    /// through the same field parsers. Non-object values are a record parse error.
    pub fn from_json_value(value: &JsonValue) -> Result<Self> {
        let map = value.as_object().ok_or_else(|| RagbenchError::RecordParse {
            location: "json".to_string(),
            message: format!("expected an object, got {}", value),
        })?;
        let cell = |key: &str| map.get(key).and_then(json_cell);
        Ok(Self {
            query_id: cell("query_id"),
            precision_at_5: cell("precision_at_5"),
            overall_precision: cell("overall_precision"),
            mrr: cell("mrr"),
            success: cell("success"),
            results_count: cell("results_count"),
        })
    }
}

fn json_cell(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        other => Some(other.to_string()),
    }
}

/// Trimmed cell text, treating blank cells as absent.
fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a score cell (precision, MRR) as a float in [0, 1].
///
/// Returns `Ok(None)` when the cell is absent or blank, and a
/// `FieldParse` error for text that is not a finite number in range.
pub fn parse_score(field: &str, raw: Option<&str>) -> Result<Option<f64>> {
    let Some(text) = present(raw) else {
        return Ok(None);
    };
    let value: f64 = text.parse().map_err(|e| RagbenchError::FieldParse {
        field: field.to_string(),
        message: format!("'{}': {}", text, e),
    })?;
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(RagbenchError::FieldParse {
            field: field.to_string(),
            message: format!("'{}' is outside [0, 1]", text),
        });
    }
    Ok(Some(value))
}

/// Parse a boolean-like success cell.
///
/// `1`/`true`/`yes`/`y`/`t` and any other non-zero number are hits;
/// `0`/`false`/`no`/`n`/`f` are misses.
pub fn parse_success(raw: Option<&str>) -> Result<Option<bool>> {
    let Some(text) = present(raw) else {
        return Ok(None);
    };
    match text.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "t" => return Ok(Some(true)),
        "0" | "false" | "no" | "n" | "f" => return Ok(Some(false)),
        _ => {}
    }
    match text.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(Some(n != 0.0)),
        _ => Err(RagbenchError::FieldParse {
            field: "success".to_string(),
            message: format!("'{}' is not boolean-like", text),
        }),
    }
}

/// Parse a non-negative result count. Integral floats such as `3.0` are accepted.
pub fn parse_count(raw: Option<&str>) -> Result<Option<u64>> {
    let Some(text) = present(raw) else {
        return Ok(None);
    };
    if let Ok(n) = text.parse::<u64>() {
        return Ok(Some(n));
    }
    match text.parse::<f64>() {
        Ok(n) if n.is_finite() && n >= 0.0 && n.fract() == 0.0 => Ok(Some(n as u64)),
        _ => Err(RagbenchError::FieldParse {
            field: "results_count".to_string(),
            message: format!("'{}' is not a non-negative integer", text),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_score_accepts_unit_interval() {
        assert_eq!(parse_score("mrr", Some("0.25")).unwrap(), Some(0.25));
        assert_eq!(parse_score("mrr", Some(" 1 ")).unwrap(), Some(1.0));
    }

    #[test]
    fn parse_score_blank_is_absent() {
        assert_eq!(parse_score("mrr", None).unwrap(), None);
        assert_eq!(parse_score("mrr", Some("   ")).unwrap(), None);
    }

    #[test]
    fn parse_score_rejects_garbage_and_out_of_range() {
        assert!(parse_score("mrr", Some("abc")).is_err());
        assert!(parse_score("mrr", Some("1.5")).is_err());
        assert!(parse_score("mrr", Some("NaN")).is_err());
        assert!(parse_score("mrr", Some("-0.1")).is_err());
    }

    #[test]
    fn parse_success_variants() {
        assert_eq!(parse_success(Some("1")).unwrap(), Some(true));
        assert_eq!(parse_success(Some("True")).unwrap(), Some(true));
        assert_eq!(parse_success(Some("yes")).unwrap(), Some(true));
        assert_eq!(parse_success(Some("0")).unwrap(), Some(false));
        assert_eq!(parse_success(Some("false")).unwrap(), Some(false));
        assert_eq!(parse_success(Some("1.0")).unwrap(), Some(true));
        assert_eq!(parse_success(None).unwrap(), None);
        assert!(parse_success(Some("maybe")).is_err());
    }

    #[test]
    fn parse_count_variants() {
        assert_eq!(parse_count(Some("3")).unwrap(), Some(3));
        assert_eq!(parse_count(Some("3.0")).unwrap(), Some(3));
        assert_eq!(parse_count(Some("")).unwrap(), None);
        assert!(parse_count(Some("-1")).is_err());
        assert!(parse_count(Some("2.5")).is_err());
    }

    #[test]
    fn from_json_value_renders_cells() {
        let value = json!({
            "query_id": "q1",
            "precision_at_5": 0.8,
            "mrr": null,
            "success": true,
            "results_count": 3
        });
        let record = EvaluationRecord::from_json_value(&value).unwrap();
        assert_eq!(record.query_id.as_deref(), Some("q1"));
        assert_eq!(record.precision_at_5.as_deref(), Some("0.8"));
        assert_eq!(record.mrr, None);
        assert_eq!(record.success.as_deref(), Some("1"));
        assert_eq!(record.results_count.as_deref(), Some("3"));
        assert_eq!(record.overall_precision, None);
    }

    #[test]
    fn from_json_value_rejects_non_object() {
        let err = EvaluationRecord::from_json_value(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, RagbenchError::RecordParse { .. }));
    }
}
