//! Record loader: find and read the most relevant dataset for a method or model.

pub mod discovery;
pub mod sources;

pub use discovery::locate;
pub use sources::{read_json_lines, read_rated_csv, read_structured};

use crate::eval::EvaluationRecord;
use crate::error::RagbenchError;
use std::fmt;
use std::path::{Path, PathBuf};

/// The two independent dataset kinds kept per method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Post-manual-evaluation table carrying the metric columns.
    Rated,
    /// Pre-evaluation harness output; only signals "tested, not yet scored".
    Raw,
}

impl SourceKind {
    pub(crate) fn tag(&self) -> &'static str {
        match self {
            SourceKind::Rated => "rated",
            SourceKind::Raw => "raw",
        }
    }

    pub(crate) fn extension(&self) -> &'static str {
        match self {
            SourceKind::Rated => "csv",
            SourceKind::Raw => "jsonl",
        }
    }

    /// Canonical file kept up to date inside the method directory.
    pub(crate) fn latest_file_name(&self) -> String {
        format!("latest_{}.{}", self.tag(), self.extension())
    }

    /// Kind implied by an explicitly supplied file's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(SourceKind::Rated),
            "jsonl" | "json" => Some(SourceKind::Raw),
            _ => None,
        }
    }
}

/// Records read from one file.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub kind: SourceKind,
    pub path: PathBuf,
    pub records: Vec<EvaluationRecord>,
}

/// Evaluation state of one competitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodStatus {
    Evaluated,
    Pending { raw_records: usize },
    NotTested,
}

impl MethodStatus {
    pub fn is_evaluated(&self) -> bool {
        matches!(self, MethodStatus::Evaluated)
    }
}

impl fmt::Display for MethodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodStatus::Evaluated => f.write_str("Evaluated"),
            MethodStatus::Pending { raw_records } => {
                write!(f, "Tested ({} raw results), pending evaluation", raw_records)
            }
            MethodStatus::NotTested => f.write_str("Not tested"),
        }
    }
}

/// Everything the loader found for one method.
#[derive(Debug, Clone)]
pub struct MethodData {
    pub name: String,
    pub rated: Option<Dataset>,
    pub raw: Option<Dataset>,
}

impl MethodData {
    pub fn status(&self) -> MethodStatus {
        match (&self.rated, &self.raw) {
            (Some(_), _) => MethodStatus::Evaluated,
            (None, Some(raw)) => MethodStatus::Pending {
                raw_records: raw.records.len(),
            },
            (None, None) => MethodStatus::NotTested,
        }
    }

    /// The most relevant dataset: rated when present, raw otherwise.
    pub fn best(&self) -> Option<&Dataset> {
        self.rated.as_ref().or(self.raw.as_ref())
    }
}

/// Read a dataset file of the given kind, absorbing failures as "not found".
fn read_dataset(kind: SourceKind, path: &Path) -> Option<Dataset> {
    let records = match kind {
        SourceKind::Rated => read_rated_csv(path),
        SourceKind::Raw => read_structured(path),
    };
    match records {
        Ok(records) => {
            log::info!(
                "Using {} dataset {} ({} records)",
                kind.tag(),
                path.display(),
                records.len()
            );
            Some(Dataset {
                kind,
                path: path.to_path_buf(),
                records,
            })
        }
        Err(e) => {
            log::warn!("Skipping unreadable dataset {}: {}", path.display(), e);
            None
        }
    }
}

/// Load both source kinds for `name` under `base`.
///
/// An explicit file replaces discovery: its extension decides whether it is
/// the rated or the raw source. Absence of data is not an error; it shows up
/// as `MethodStatus::NotTested`.
pub fn load_method(base: &Path, name: &str, explicit: Option<&Path>) -> MethodData {
    let mut data = MethodData {
        name: name.to_string(),
        rated: None,
        raw: None,
    };

    if let Some(path) = explicit {
        let kind = match SourceKind::from_path(path) {
            Some(kind) => kind,
            None => {
                log::warn!(
                    "{}",
                    RagbenchError::InvalidInput(format!(
                        "unsupported dataset extension for {}: {}",
                        name,
                        path.display()
                    ))
                );
                return data;
            }
        };
        if !path.is_file() {
            log::warn!(
                "{}",
                RagbenchError::MissingDataset(format!("{} ({})", path.display(), name))
            );
            return data;
        }
        let dataset = read_dataset(kind, path);
        match kind {
            SourceKind::Rated => data.rated = dataset,
            SourceKind::Raw => data.raw = dataset,
        }
        return data;
    }

    data.rated = locate(base, name, SourceKind::Rated).and_then(|p| read_dataset(SourceKind::Rated, &p));
    data.raw = locate(base, name, SourceKind::Raw).and_then(|p| read_dataset(SourceKind::Raw, &p));

    if data.rated.is_none() && data.raw.is_none() {
        log::info!("No dataset found for {} under {}", name, base.display());
    }
    data
}

/// Most relevant dataset for `name`, or `None` when nothing exists yet.
pub fn load_dataset(base: &Path, name: &str, explicit: Option<&Path>) -> Option<Dataset> {
    let data = load_method(base, name, explicit);
    data.rated.or(data.raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const HEADER: &str = "query_id,precision_at_5,overall_precision,mrr,success,results_count\n";

    #[test]
    fn status_evaluated_when_rated_exists() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("bm25");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("latest_rated.csv"), format!("{}q1,0.8,,0.5,1,3\n", HEADER)).unwrap();
        fs::write(dir.join("latest_raw.jsonl"), "{\"query_id\":\"q1\"}\n").unwrap();

        let data = load_method(temp_dir.path(), "bm25", None);
        assert_eq!(data.status(), MethodStatus::Evaluated);
        assert_eq!(data.best().unwrap().kind, SourceKind::Rated);
        assert_eq!(data.rated.unwrap().records.len(), 1);
    }

    #[test]
    fn status_pending_with_raw_only() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("vector");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("vector_raw_20250101_120000.jsonl"),
            "{\"query_id\":\"q1\"}\n{\"query_id\":\"q2\"}\n",
        )
        .unwrap();

        let data = load_method(temp_dir.path(), "vector", None);
        assert_eq!(data.status(), MethodStatus::Pending { raw_records: 2 });
    }

    #[test]
    fn status_not_tested_without_data() {
        let temp_dir = TempDir::new().unwrap();
        let data = load_method(temp_dir.path(), "hybrid", None);
        assert_eq!(data.status(), MethodStatus::NotTested);
        assert!(load_dataset(temp_dir.path(), "hybrid", None).is_none());
    }

    #[test]
    fn explicit_file_overrides_discovery() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("bm25");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("latest_rated.csv"), format!("{}q1,0.8,,0.5,1,3\n", HEADER)).unwrap();
        let explicit = temp_dir.path().join("custom.csv");
        fs::write(&explicit, format!("{}a,1,,1,1,1\nb,0,,0,0,0\n", HEADER)).unwrap();

        let dataset = load_dataset(temp_dir.path(), "bm25", Some(&explicit)).unwrap();
        assert_eq!(dataset.path, explicit);
        assert_eq!(dataset.records.len(), 2);
    }

    #[test]
    fn missing_explicit_file_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let explicit = temp_dir.path().join("missing.csv");
        let data = load_method(temp_dir.path(), "bm25", Some(&explicit));
        assert_eq!(data.status(), MethodStatus::NotTested);
    }

    #[test]
    fn status_display() {
        assert_eq!(MethodStatus::NotTested.to_string(), "Not tested");
        assert_eq!(
            MethodStatus::Pending { raw_records: 4 }.to_string(),
            "Tested (4 raw results), pending evaluation"
        );
    }
}
