//! Comparative reporter: tabular comparison, per-metric winners and the composite winner.

pub mod compare;
pub mod render;

pub use compare::{compare, ComparisonReport, MethodEntry, MetricWinner, Ranking, ScoringWeights, Winner};
pub use render::{render, write_report};

use serde::Serialize;

/// Which comparison is being run. Both share the same engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Retrieval methods (bm25, vector, hybrid, ...)
    Methods,
    /// LLM backends
    Models,
}

impl Phase {
    pub fn title(&self) -> &'static str {
        match self {
            Phase::Methods => "RETRIEVAL METHOD COMPARISON",
            Phase::Models => "LLM MODEL COMPARISON",
        }
    }

    /// Singular noun for the compared entries.
    pub fn noun(&self) -> &'static str {
        match self {
            Phase::Methods => "method",
            Phase::Models => "model",
        }
    }

    /// Used in persisted report file names.
    pub fn slug(&self) -> &'static str {
        match self {
            Phase::Methods => "method",
            Phase::Models => "model",
        }
    }
}
