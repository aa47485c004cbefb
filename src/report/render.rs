use crate::error::Result;
use crate::eval::MetricKind;
use crate::loader::MethodStatus;
use crate::report::{ComparisonReport, MethodEntry, Phase};
use chrono::{NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};

const BANNER_WIDTH: usize = 80;
const NA: &str = "N/A";

fn plural(n: usize) -> &'static str {
    if n == 1 {
        "query"
    } else {
        "queries"
    }
}

fn status_line(entry: &MethodEntry) -> String {
    match (&entry.status, &entry.aggregate) {
        (MethodStatus::Evaluated, Some(agg)) => {
            format!("Evaluated ({} {})", agg.total_queries, plural(agg.total_queries))
        }
        (status, _) => status.to_string(),
    }
}

fn total_cell(entry: &MethodEntry) -> String {
    entry
        .aggregate
        .as_ref()
        .map(|a| a.total_queries.to_string())
        .unwrap_or_else(|| NA.to_string())
}

fn metric_cell(entry: &MethodEntry, kind: MetricKind) -> String {
    entry
        .aggregate
        .as_ref()
        .and_then(|a| a.reportable(kind))
        .map(|v| kind.format(v))
        .unwrap_or_else(|| NA.to_string())
}

fn table_row<S: AsRef<str>>(cells: impl IntoIterator<Item = S>) -> String {
    let cells: Vec<S> = cells.into_iter().collect();
    let joined: Vec<&str> = cells.iter().map(|c| c.as_ref()).collect();
    format!("| {} |", joined.join(" | "))
}

/// Render the comparison as plain text with a markdown-style table.
///
/// The same text is printed to the console and, in file mode, persisted verbatim.
pub fn render(report: &ComparisonReport, generated_at: NaiveDateTime) -> String {
    let banner = "=".repeat(BANNER_WIDTH);
    let noun = report.phase.noun();
    let mut lines = vec![
        banner.clone(),
        report.phase.title().to_string(),
        format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S")),
        banner.clone(),
        String::new(),
        "## Summary".to_string(),
        String::new(),
    ];

    let mut header = vec!["Metric".to_string()];
    header.extend(report.entries.iter().map(|e| e.name.clone()));
    lines.push(table_row(&header));
    lines.push(table_row(std::iter::repeat("---").take(header.len())));

    let mut totals = vec!["Total Queries".to_string()];
    totals.extend(report.entries.iter().map(total_cell));
    lines.push(table_row(&totals));

    for kind in MetricKind::ALL {
        let mut row = vec![kind.label().to_string()];
        row.extend(report.entries.iter().map(|e| metric_cell(e, kind)));
        lines.push(table_row(&row));
    }

    lines.push(String::new());
    lines.push("## Status".to_string());
    lines.push(String::new());
    for entry in &report.entries {
        lines.push(format!("- {}: {}", entry.name, status_line(entry)));
    }
    lines.push(String::new());

    match &report.ranking {
        Some(ranking) => {
            lines.push(format!("## Best {} per Metric", noun));
            lines.push(String::new());
            for w in &ranking.metric_winners {
                lines.push(format!("- {}: {} ({})", w.metric, w.method, w.metric.format(w.value)));
            }
            lines.push(String::new());

            lines.push("## Composite Ranking".to_string());
            lines.push(String::new());
            let weights: Vec<String> = ranking
                .weights
                .iter()
                .map(|(kind, weight)| format!("{} {:.2}", kind, weight))
                .collect();
            lines.push(format!("Weights: {}", weights.join(", ")));
            for (name, score) in &ranking.scores {
                lines.push(format!("- {}: {:.3}", name, score));
            }
            lines.push(String::new());

            match &ranking.winner {
                Some(winner) => {
                    lines.push(format!(
                        "Winner: {} (composite score: {:.3})",
                        winner.method, winner.score
                    ));
                    lines.push(format!(
                        "Recommendation: use {} as the default {} (composite score {:.3}).",
                        winner.method,
                        recommendation_target(report.phase),
                        winner.score
                    ));
                }
                None => lines.push(format!(
                    "No winner: no {} has evaluated queries.",
                    noun
                )),
            }
        }
        None => {
            let pending = report
                .entries
                .iter()
                .filter(|e| !e.status.is_evaluated())
                .count();
            lines.push(format!(
                "Composite ranking withheld: {} of {} {}s not fully evaluated.",
                pending,
                report.entries.len(),
                noun
            ));
        }
    }

    lines.push(banner);
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

fn recommendation_target(phase: Phase) -> &'static str {
    match phase {
        Phase::Methods => "retrieval method",
        Phase::Models => "LLM backend",
    }
}

/// Persist a rendered report as `<dir>/<phase>_comparison_<YYYY-MM-DD>.md`.
pub fn write_report(dir: &Path, phase: Phase, date: NaiveDate, text: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!(
        "{}_comparison_{}.md",
        phase.slug(),
        date.format("%Y-%m-%d")
    ));
    std::fs::write(&path, text)?;
    log::info!("Report written to {}", path.display());
    Ok(path)
}
