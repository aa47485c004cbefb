pub mod config;
pub mod error;
pub mod eval;
pub mod export;
pub mod loader;
pub mod report;

pub use config::Config;
pub use error::{RagbenchError, Result};
pub use eval::{aggregate, EvaluationRecord, MethodAggregate, MetricKind};
pub use loader::{load_dataset, load_method, MethodStatus};
pub use report::{compare, render, ComparisonReport, Phase, ScoringWeights};
