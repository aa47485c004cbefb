//! Evaluation records and the metric aggregator (P@5, overall precision, MRR, success rate, coverage).

pub mod metrics;
pub mod record;

pub use metrics::{aggregate, MethodAggregate, MetricKind, MetricValue};
pub use record::EvaluationRecord;
