use crate::loader::SourceKind;
use chrono::NaiveDateTime;
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Timestamp embedded in dataset file names (`<name>_<tag>_YYYYMMDD_HHMMSS.<ext>`).
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Find the dataset file of `kind` for `name` under `base`.
///
/// Search order:
/// 1. `<base>/<name>/latest_<tag>.<ext>`
/// 2. the newest `<base>/<name>/<name>_<tag>_YYYYMMDD_HHMMSS.<ext>`
/// 3. legacy flat layout `<base>/<name>_<tag>.<ext>`
///
/// Step 2 only considers names that match the stamp pattern exactly and whose
/// stamp parses as a real date-time; the newest is picked by parsed timestamp,
/// not by incidental lexical order.
pub fn locate(base: &Path, name: &str, kind: SourceKind) -> Option<PathBuf> {
    let method_dir = base.join(name);

    let latest = method_dir.join(kind.latest_file_name());
    if latest.is_file() {
        return Some(latest);
    }

    if let Some(stamped) = newest_stamped(&method_dir, name, kind) {
        return Some(stamped);
    }

    let legacy = base.join(format!("{}_{}.{}", name, kind.tag(), kind.extension()));
    if legacy.is_file() {
        log::debug!("Falling back to legacy dataset {}", legacy.display());
        return Some(legacy);
    }

    None
}

fn newest_stamped(dir: &Path, name: &str, kind: SourceKind) -> Option<PathBuf> {
    if !dir.is_dir() {
        return None;
    }

    let pattern = format!(
        r"^{}_{}_(\d{{8}}_\d{{6}})\.{}$",
        regex::escape(name),
        kind.tag(),
        kind.extension()
    );
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            log::warn!("Invalid dataset pattern for {}: {}", name, e);
            return None;
        }
    };

    let mut best: Option<(NaiveDateTime, PathBuf)> = None;
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();
        let Some(caps) = re.captures(&file_name) else {
            continue;
        };
        let stamp = match NaiveDateTime::parse_from_str(&caps[1], STAMP_FORMAT) {
            Ok(stamp) => stamp,
            Err(e) => {
                log::warn!("Ignoring {}: bad timestamp ({})", entry.path().display(), e);
                continue;
            }
        };
        let newer = match &best {
            Some((current, _)) => stamp > *current,
            None => true,
        };
        if newer {
            best = Some((stamp, entry.path().to_path_buf()));
        }
    }

    best.map(|(_, path)| path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn prefers_latest_file() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("bm25");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("latest_rated.csv"), "").unwrap();
        fs::write(dir.join("bm25_rated_20250101_000000.csv"), "").unwrap();

        let found = locate(temp_dir.path(), "bm25", SourceKind::Rated).unwrap();
        assert!(found.ends_with("bm25/latest_rated.csv"));
    }

    #[test]
    fn picks_newest_stamped_file() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("hybrid");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("hybrid_rated_20240301_090000.csv"), "").unwrap();
        fs::write(dir.join("hybrid_rated_20250102_080000.csv"), "").unwrap();
        fs::write(dir.join("hybrid_rated_20250101_230000.csv"), "").unwrap();
        // Does not match the strict pattern even though it sorts last.
        fs::write(dir.join("hybrid_rated_final.csv"), "").unwrap();
        // Matches the shape but is not a real date.
        fs::write(dir.join("hybrid_rated_20251399_000000.csv"), "").unwrap();

        let found = locate(temp_dir.path(), "hybrid", SourceKind::Rated).unwrap();
        assert!(found.ends_with("hybrid_rated_20250102_080000.csv"));
    }

    #[test]
    fn kinds_do_not_cross() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("vector");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("vector_raw_20250101_000000.jsonl"), "").unwrap();

        assert!(locate(temp_dir.path(), "vector", SourceKind::Rated).is_none());
        assert!(locate(temp_dir.path(), "vector", SourceKind::Raw).is_some());
    }

    #[test]
    fn falls_back_to_legacy_layout() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("bm25_rated.csv"), "").unwrap();

        let found = locate(temp_dir.path(), "bm25", SourceKind::Rated).unwrap();
        assert_eq!(found, temp_dir.path().join("bm25_rated.csv"));
    }

    #[test]
    fn method_names_are_escaped() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("gpt-4o.mini");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("gpt-4oXmini_rated_20250101_000000.csv"), "").unwrap();

        assert!(locate(temp_dir.path(), "gpt-4o.mini", SourceKind::Rated).is_none());
    }
}
