//! Metric aggregation: reduce per-query records to one `MethodAggregate`.

use crate::eval::record::{parse_count, parse_score, parse_success, EvaluationRecord};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The aggregate metrics reported per method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    #[serde(rename = "precision_at_5")]
    PrecisionAt5,
    #[serde(rename = "overall_precision")]
    OverallPrecision,
    #[serde(rename = "mrr")]
    Mrr,
    #[serde(rename = "success_rate")]
    SuccessRate,
    #[serde(rename = "coverage")]
    Coverage,
}

impl MetricKind {
    /// All metrics, in report row order.
    pub const ALL: [MetricKind; 5] = [
        MetricKind::PrecisionAt5,
        MetricKind::OverallPrecision,
        MetricKind::Mrr,
        MetricKind::SuccessRate,
        MetricKind::Coverage,
    ];

    /// Human-readable label used in report tables.
    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::PrecisionAt5 => "Precision@5",
            MetricKind::OverallPrecision => "Overall Precision",
            MetricKind::Mrr => "MRR",
            MetricKind::SuccessRate => "Success Rate",
            MetricKind::Coverage => "Coverage",
        }
    }

    /// Column/config key, matching the record field names.
    pub fn key(&self) -> &'static str {
        match self {
            MetricKind::PrecisionAt5 => "precision_at_5",
            MetricKind::OverallPrecision => "overall_precision",
            MetricKind::Mrr => "mrr",
            MetricKind::SuccessRate => "success_rate",
            MetricKind::Coverage => "coverage",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }

    /// Render a value: ratios with 3 decimals, everything else as a percentage with 2.
    pub fn format(&self, value: f64) -> String {
        match self {
            MetricKind::Mrr => format!("{:.3}", value),
            _ => format!("{:.2}%", value * 100.0),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One aggregated metric with the number of records that contributed a usable value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricValue {
    pub value: f64,
    pub valid_count: usize,
}

impl MetricValue {
    /// True when at least one record contributed to this metric.
    pub fn has_signal(&self) -> bool {
        self.valid_count > 0
    }
}

/// Aggregate metrics for a single method (or model).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MethodAggregate {
    pub total_queries: usize,
    pub precision_at_5: MetricValue,
    pub overall_precision: MetricValue,
    pub mrr: MetricValue,
    /// Hits over `total_queries`; `valid_count` is the number of parsable success cells.
    pub success_rate: MetricValue,
    /// Records with `results_count > 0` over `total_queries`; `valid_count` is the
    /// number of parsable `results_count` cells.
    pub coverage: MetricValue,
}

impl MethodAggregate {
    pub fn metric(&self, kind: MetricKind) -> &MetricValue {
        match kind {
            MetricKind::PrecisionAt5 => &self.precision_at_5,
            MetricKind::OverallPrecision => &self.overall_precision,
            MetricKind::Mrr => &self.mrr,
            MetricKind::SuccessRate => &self.success_rate,
            MetricKind::Coverage => &self.coverage,
        }
    }

    /// An aggregate over zero records carries no signal and must not be ranked.
    pub fn has_signal(&self) -> bool {
        self.total_queries > 0
    }

    /// The value to show and rank for `kind`, or `None` when there is nothing to report.
    ///
    /// Success rate and coverage are denominated by `total_queries`, so they are
    /// reportable whenever any record exists. Mean metrics need a valid sample.
    pub fn reportable(&self, kind: MetricKind) -> Option<f64> {
        if !self.has_signal() {
            return None;
        }
        let metric = self.metric(kind);
        match kind {
            MetricKind::SuccessRate | MetricKind::Coverage => Some(metric.value),
            _ if metric.has_signal() => Some(metric.value),
            _ => None,
        }
    }
}

/// Running sum for one metric.
#[derive(Default)]
struct Accumulator {
    sum: f64,
    valid: usize,
}

impl Accumulator {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.valid += 1;
    }

    /// Mean over the valid samples; 0.0 when there are none.
    fn mean(&self) -> MetricValue {
        let value = if self.valid == 0 {
            0.0
        } else {
            self.sum / self.valid as f64
        };
        MetricValue {
            value,
            valid_count: self.valid,
        }
    }

    /// Sum over a fixed denominator; 0.0 when the denominator is zero.
    fn rate(&self, denominator: usize) -> MetricValue {
        let value = if denominator == 0 {
            0.0
        } else {
            self.sum / denominator as f64
        };
        MetricValue {
            value,
            valid_count: self.valid,
        }
    }
}

/// Feed one parsed field into an accumulator, logging and skipping parse failures.
fn absorb<T>(
    acc: &mut Accumulator,
    index: usize,
    parsed: Result<Option<T>>,
    to_value: impl FnOnce(T) -> f64,
) {
    match parsed {
        Ok(Some(v)) => acc.push(to_value(v)),
        Ok(None) => {}
        Err(e) => log::debug!("record {}: {}; excluded from this metric", index, e),
    }
}

/// Reduce records into a `MethodAggregate`.
///
/// Each metric keeps its own valid-sample count: an unparsable field drops
/// that record from that metric only. `success_rate` and `coverage` are
/// always denominated by the total number of records. Accumulation follows
/// input order, so identical input gives bit-identical output.
pub fn aggregate(records: &[EvaluationRecord]) -> MethodAggregate {
    let mut p5 = Accumulator::default();
    let mut overall = Accumulator::default();
    let mut mrr = Accumulator::default();
    let mut success = Accumulator::default();
    let mut covered = Accumulator::default();

    for (index, record) in records.iter().enumerate() {
        absorb(
            &mut p5,
            index,
            parse_score("precision_at_5", record.precision_at_5.as_deref()),
            |v| v,
        );
        absorb(
            &mut overall,
            index,
            parse_score("overall_precision", record.overall_precision.as_deref()),
            |v| v,
        );
        absorb(&mut mrr, index, parse_score("mrr", record.mrr.as_deref()), |v| v);
        absorb(
            &mut success,
            index,
            parse_success(record.success.as_deref()),
            |hit| if hit { 1.0 } else { 0.0 },
        );
        absorb(
            &mut covered,
            index,
            parse_count(record.results_count.as_deref()),
            |n| if n > 0 { 1.0 } else { 0.0 },
        );
    }

    let total = records.len();
    MethodAggregate {
        total_queries: total,
        precision_at_5: p5.mean(),
        overall_precision: overall.mean(),
        mrr: mrr.mean(),
        success_rate: success.rate(total),
        coverage: covered.rate(total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(p5: &str, mrr: &str, success: &str, results_count: &str) -> EvaluationRecord {
        let cell = |s: &str| if s.is_empty() { None } else { Some(s.to_string()) };
        EvaluationRecord {
            query_id: None,
            precision_at_5: cell(p5),
            overall_precision: None,
            mrr: cell(mrr),
            success: cell(success),
            results_count: cell(results_count),
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn aggregate_empty_input() {
        let agg = aggregate(&[]);
        assert_eq!(agg.total_queries, 0);
        assert!(!agg.has_signal());
        for kind in MetricKind::ALL {
            assert_eq!(agg.metric(kind).value, 0.0);
            assert_eq!(agg.metric(kind).valid_count, 0);
        }
    }

    #[test]
    fn aggregate_two_records() {
        let records = vec![record("0.8", "0.5", "1", "3"), record("0.4", "0.3", "0", "0")];
        let agg = aggregate(&records);
        assert_eq!(agg.total_queries, 2);
        assert!(approx(agg.precision_at_5.value, 0.6));
        assert!(approx(agg.mrr.value, 0.4));
        assert!(approx(agg.success_rate.value, 0.5));
        assert!(approx(agg.coverage.value, 0.5));
        assert_eq!(agg.overall_precision.valid_count, 0);
        assert_eq!(agg.overall_precision.value, 0.0);
    }

    #[test]
    fn unparsable_field_shrinks_only_its_denominator() {
        let records = vec![
            record("0.9", "not-a-number", "1", "2"),
            record("bad", "0.5", "1", "2"),
            record("0.3", "1.0", "1", "2"),
        ];
        let agg = aggregate(&records);
        assert_eq!(agg.precision_at_5.valid_count, 2);
        assert!(approx(agg.precision_at_5.value, 0.6));
        assert_eq!(agg.mrr.valid_count, 2);
        assert!(approx(agg.mrr.value, 0.75));
        assert!(approx(agg.success_rate.value, 1.0));
    }

    #[test]
    fn success_rate_denominator_is_total_queries() {
        let records = vec![
            record("", "", "1", ""),
            record("", "", "", ""),
            record("", "", "garbage", ""),
            record("", "", "1", ""),
        ];
        let agg = aggregate(&records);
        assert_eq!(agg.total_queries, 4);
        assert_eq!(agg.success_rate.valid_count, 2);
        assert!(approx(agg.success_rate.value, 0.5));
    }

    #[test]
    fn coverage_counts_positive_results_over_total() {
        let records = vec![
            record("", "", "", "5"),
            record("", "", "", "0"),
            record("", "", "", ""),
            record("", "", "", "x"),
        ];
        let agg = aggregate(&records);
        assert!(approx(agg.coverage.value, 0.25));
        assert_eq!(agg.coverage.valid_count, 2);
    }

    #[test]
    fn values_stay_in_unit_interval() {
        let records = vec![
            record("1.0", "1.0", "1", "10"),
            record("0.0", "0.0", "0", "0"),
            record("2.0", "-1", "1", "1"),
        ];
        let agg = aggregate(&records);
        for kind in MetricKind::ALL {
            let v = agg.metric(kind).value;
            assert!((0.0..=1.0).contains(&v), "{} out of range: {}", kind, v);
        }
    }

    #[test]
    fn shuffled_order_matches_within_tolerance() {
        let records = vec![
            record("0.1", "0.2", "1", "1"),
            record("0.7", "0.9", "0", "0"),
            record("0.3", "0.33", "1", "4"),
            record("0.55", "1.0", "0", "2"),
        ];
        let mut reversed = records.clone();
        reversed.reverse();
        let a = aggregate(&records);
        let b = aggregate(&reversed);
        for kind in MetricKind::ALL {
            assert!((a.metric(kind).value - b.metric(kind).value).abs() < 1e-12);
        }
        assert_eq!(aggregate(&records), a);
    }

    #[test]
    fn reportable_needs_samples_for_means_only() {
        let agg = aggregate(&[record("", "", "", "")]);
        assert_eq!(agg.reportable(MetricKind::PrecisionAt5), None);
        assert_eq!(agg.reportable(MetricKind::SuccessRate), Some(0.0));
        assert_eq!(agg.reportable(MetricKind::Coverage), Some(0.0));
        assert_eq!(aggregate(&[]).reportable(MetricKind::SuccessRate), None);
    }

    #[test]
    fn format_rules() {
        assert_eq!(MetricKind::PrecisionAt5.format(0.6), "60.00%");
        assert_eq!(MetricKind::Mrr.format(0.4), "0.400");
        assert_eq!(MetricKind::Coverage.format(1.0), "100.00%");
    }
}
