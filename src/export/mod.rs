//! Bulk exporter: concatenate dated metrics logs and emit grouped summaries.

pub mod select;
pub mod summary;
pub mod writer;

pub use select::{select_files, Selection};
pub use summary::{group_by_column, group_by_day, FieldStats, JsonRecord, SummaryRow, SummaryTable};

use crate::error::{RagbenchError, Result};
use crate::loader::read_json_lines;
use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Kinds of line-delimited metrics logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ExportCategory {
    Search,
    Llm,
    Embedding,
}

impl ExportCategory {
    pub fn slug(&self) -> &'static str {
        match self {
            ExportCategory::Search => "search",
            ExportCategory::Llm => "llm",
            ExportCategory::Embedding => "embedding",
        }
    }

    /// Column the main summary is grouped by.
    pub fn group_key(&self) -> &'static str {
        match self {
            ExportCategory::Search => "method",
            ExportCategory::Llm | ExportCategory::Embedding => "model",
        }
    }

    /// Numeric fields summarised for this category.
    pub fn numeric_fields(&self) -> &'static [&'static str] {
        match self {
            ExportCategory::Search => &["latency_ms", "results_count", "top_score"],
            ExportCategory::Llm => &["latency_ms", "prompt_tokens", "completion_tokens", "total_tokens"],
            ExportCategory::Embedding => &["latency_ms", "batch_size", "total_tokens"],
        }
    }

    /// Only search logs get a per-day summary.
    pub fn has_daily_summary(&self) -> bool {
        matches!(self, ExportCategory::Search)
    }
}

/// Exact day or trailing window of days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSelector {
    Exact(NaiveDate),
    Trailing(u32),
}

impl DateSelector {
    fn label(&self) -> String {
        match self {
            DateSelector::Exact(date) => date.format("%Y-%m-%d").to_string(),
            DateSelector::Trailing(days) => format!("last_{}d", days),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// Root holding `<category>/<category>_metrics_<date>.jsonl`.
    pub metrics_root: PathBuf,
    pub out_dir: PathBuf,
    pub category: ExportCategory,
    pub selector: DateSelector,
    pub today: NaiveDate,
}

impl ExportRequest {
    pub fn prefix(&self) -> String {
        format!("{}_metrics_{}", self.category.slug(), self.selector.label())
    }
}

/// What an export did.
#[derive(Debug, Clone, Default)]
pub struct ExportOutcome {
    pub records: usize,
    pub files_read: Vec<PathBuf>,
    pub fail_open: Vec<PathBuf>,
    pub written: Vec<PathBuf>,
    pub summaries: Vec<SummaryTable>,
    /// Summary steps that were aborted, with the reason.
    pub aborted: Vec<String>,
}

/// Read and concatenate every selected file, in order.
///
/// Unreadable files and malformed or non-object lines are skipped with a warning.
pub fn collect_records(files: &[PathBuf]) -> (Vec<JsonRecord>, Vec<PathBuf>) {
    let mut records = Vec::new();
    let mut read = Vec::new();
    for path in files {
        let values = match read_json_lines(path) {
            Ok(values) => values,
            Err(e) => {
                log::warn!("Skipping unreadable metrics file {}: {}", path.display(), e);
                continue;
            }
        };
        let before = records.len();
        for value in values {
            match value {
                serde_json::Value::Object(map) => records.push(map),
                other => log::warn!(
                    "{}: skipping non-object line {}",
                    path.display(),
                    other
                ),
            }
        }
        log::debug!("{}: {} records", path.display(), records.len() - before);
        read.push(path.clone());
    }
    (records, read)
}

/// Run one export: select, concatenate, write raw CSV and the summaries.
///
/// Zero matching records is a clean no-op. A summary that cannot be built
/// (`MissingCapability`) is logged and skipped; the raw export still stands.
pub fn run_export(request: &ExportRequest) -> Result<ExportOutcome> {
    let category_dir = request.metrics_root.join(request.category.slug());
    let selection = select_files(
        &category_dir,
        request.category,
        request.selector,
        request.today,
    );

    let (records, files_read) = collect_records(&selection.files);
    let mut outcome = ExportOutcome {
        records: records.len(),
        files_read,
        fail_open: selection.fail_open,
        ..ExportOutcome::default()
    };

    if records.is_empty() {
        log::info!(
            "{}",
            RagbenchError::MissingDataset(format!(
                "no {} records for {}",
                request.category.slug(),
                request.selector.label()
            ))
        );
        return Ok(outcome);
    }

    std::fs::create_dir_all(&request.out_dir)?;
    let prefix = request.prefix();

    let raw_path = request.out_dir.join(format!("{}_raw.csv", prefix));
    writer::write_raw_csv(&records, &raw_path)?;
    log::info!("Wrote {} records to {}", records.len(), raw_path.display());
    outcome.written.push(raw_path);

    let fields = request.category.numeric_fields();
    let group = request.category.group_key();
    let grouped = group_by_column(&records, group, fields);
    write_summary(
        grouped,
        &request.out_dir.join(format!("{}_by_{}.csv", prefix, group)),
        &mut outcome,
    )?;

    if request.category.has_daily_summary() {
        let daily = group_by_day(&records, fields);
        write_summary(
            daily,
            &request.out_dir.join(format!("{}_daily.csv", prefix)),
            &mut outcome,
        )?;
    }

    Ok(outcome)
}

fn write_summary(
    table: Result<SummaryTable>,
    path: &Path,
    outcome: &mut ExportOutcome,
) -> Result<()> {
    match table {
        Ok(table) => {
            writer::write_summary_csv(&table, path)?;
            log::info!("Wrote {} summary rows to {}", table.rows.len(), path.display());
            outcome.written.push(path.to_path_buf());
            outcome.summaries.push(table);
        }
        Err(e @ RagbenchError::MissingCapability(_)) => {
            log::error!("Summary {} aborted: {}", path.display(), e);
            outcome.aborted.push(e.to_string());
        }
        Err(e) => return Err(e),
    }
    Ok(())
}
