use crate::error::{RagbenchError, Result};
use crate::eval::{MethodAggregate, MetricKind};
use crate::loader::MethodStatus;
use crate::report::Phase;
use std::collections::{BTreeMap, HashMap};

/// Metric → weight mapping for the composite score.
///
/// Weights are applied in `MetricKind::ALL` order so the sum is reproducible.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringWeights {
    weights: Vec<(MetricKind, f64)>,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            weights: vec![
                (MetricKind::PrecisionAt5, 0.4),
                (MetricKind::Mrr, 0.3),
                (MetricKind::SuccessRate, 0.2),
                (MetricKind::Coverage, 0.1),
            ],
        }
    }
}

impl ScoringWeights {
    /// Build weights from a `metric key → weight` map.
    ///
    /// Keys must name known metrics; weights must be finite, non-negative and
    /// sum to a positive total.
    pub fn from_map(map: &BTreeMap<String, f64>) -> Result<Self> {
        let mut by_kind = BTreeMap::new();
        for (key, &weight) in map {
            let kind = MetricKind::from_key(key)
                .ok_or_else(|| RagbenchError::Config(format!("unknown metric '{}'", key)))?;
            if !weight.is_finite() || weight < 0.0 {
                return Err(RagbenchError::Config(format!(
                    "weight for '{}' must be a non-negative number, got {}",
                    key, weight
                )));
            }
            by_kind.insert(kind, weight);
        }
        if by_kind.values().sum::<f64>() <= 0.0 {
            return Err(RagbenchError::Config("weights must sum to more than 0".to_string()));
        }
        let weights = MetricKind::ALL
            .into_iter()
            .filter_map(|kind| by_kind.get(&kind).map(|&w| (kind, w)))
            .collect();
        Ok(Self { weights })
    }

    pub fn get(&self, kind: MetricKind) -> f64 {
        self.weights
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, w)| *w)
            .unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricKind, f64)> + '_ {
        self.weights.iter().copied()
    }

    /// Weighted sum of the aggregate's metric values.
    pub fn score(&self, aggregate: &MethodAggregate) -> f64 {
        self.weights
            .iter()
            .map(|(kind, weight)| weight * aggregate.metric(*kind).value)
            .sum()
    }
}

/// One compared entry as it appears in the report.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodEntry {
    pub name: String,
    pub status: MethodStatus,
    /// Present only for evaluated entries.
    pub aggregate: Option<MethodAggregate>,
}

impl MethodEntry {
    /// Aggregate usable for ranking: evaluated and over at least one record.
    fn ranked(&self) -> Option<&MethodAggregate> {
        if !self.status.is_evaluated() {
            return None;
        }
        self.aggregate.as_ref().filter(|a| a.has_signal())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricWinner {
    pub metric: MetricKind,
    pub method: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Winner {
    pub method: String,
    pub score: f64,
}

/// Winner section, only produced when every entry is evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub metric_winners: Vec<MetricWinner>,
    /// Composite score per ranked entry, highest first; ties keep list order.
    pub scores: Vec<(String, f64)>,
    pub winner: Option<Winner>,
    pub weights: ScoringWeights,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonReport {
    pub phase: Phase,
    pub entries: Vec<MethodEntry>,
    /// `None` unless every entry has `MethodStatus::Evaluated`.
    pub ranking: Option<Ranking>,
}

impl ComparisonReport {
    pub fn all_evaluated(&self) -> bool {
        self.entries.iter().all(|e| e.status.is_evaluated())
    }
}

/// Compare `methods` (in their fixed order) using their aggregates and statuses.
///
/// A method missing from `statuses` is `NotTested`. The ranking section is
/// computed only if every listed method is evaluated. Evaluated methods with
/// zero queries stay in the table but take no part in ranking. Ties on any
/// maximum go to the first-listed method.
pub fn compare(
    phase: Phase,
    methods: &[String],
    aggregates: &HashMap<String, MethodAggregate>,
    statuses: &HashMap<String, MethodStatus>,
    weights: &ScoringWeights,
) -> ComparisonReport {
    let entries: Vec<MethodEntry> = methods
        .iter()
        .map(|name| {
            let status = statuses.get(name).copied().unwrap_or(MethodStatus::NotTested);
            let aggregate = if status.is_evaluated() {
                aggregates.get(name).cloned()
            } else {
                None
            };
            MethodEntry {
                name: name.clone(),
                status,
                aggregate,
            }
        })
        .collect();

    let mut report = ComparisonReport {
        phase,
        entries,
        ranking: None,
    };

    if !report.all_evaluated() {
        log::info!("Composite ranking withheld: not every {} is evaluated", phase.noun());
        return report;
    }

    report.ranking = Some(rank(&report.entries, weights));
    report
}

fn rank(entries: &[MethodEntry], weights: &ScoringWeights) -> Ranking {
    let mut metric_winners = Vec::new();
    for kind in MetricKind::ALL {
        let mut best: Option<(&str, f64)> = None;
        for entry in entries {
            let Some(value) = entry.ranked().and_then(|a| a.reportable(kind)) else {
                continue;
            };
            if best.map_or(true, |(_, top)| value > top) {
                best = Some((entry.name.as_str(), value));
            }
        }
        if let Some((method, value)) = best {
            metric_winners.push(MetricWinner {
                metric: kind,
                method: method.to_string(),
                value,
            });
        }
    }

    let mut scores: Vec<(String, f64)> = entries
        .iter()
        .filter_map(|e| e.ranked().map(|a| (e.name.clone(), weights.score(a))))
        .collect();

    let mut winner: Option<Winner> = None;
    for (method, score) in &scores {
        if winner.as_ref().map_or(true, |w| *score > w.score) {
            winner = Some(Winner {
                method: method.clone(),
                score: *score,
            });
        }
    }

    // Stable sort keeps list order for equal scores.
    scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    Ranking {
        metric_winners,
        scores,
        winner,
        weights: weights.clone(),
    }
}
