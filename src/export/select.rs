use crate::export::{DateSelector, ExportCategory};
use chrono::{Days, NaiveDate};
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Files picked for one export, in filename order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub files: Vec<PathBuf>,
    /// Subset of `files` included only because their date did not parse.
    pub fail_open: Vec<PathBuf>,
}

/// First day of a trailing window; windows reaching past the calendar start at `NaiveDate::MIN`.
fn window_start(today: NaiveDate, days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN)
}

/// Select `<dir>/<category>_metrics_<YYYY-MM-DD>.jsonl` files.
///
/// With an exact date only that date's file matches. With a trailing window
/// every file dated in `[today - days, today]` matches, plus every file whose
/// date part does not parse; those are logged and reported as fail-open.
pub fn select_files(
    dir: &Path,
    category: ExportCategory,
    selector: DateSelector,
    today: NaiveDate,
) -> Selection {
    let mut selection = Selection::default();
    if !dir.is_dir() {
        log::info!("Metrics directory {} does not exist", dir.display());
        return selection;
    }

    let pattern = format!(r"^{}_metrics_(.+)\.jsonl$", regex::escape(category.slug()));
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            log::warn!("Invalid metrics file pattern for {}: {}", category.slug(), e);
            return selection;
        }
    };

    let mut candidates: Vec<(PathBuf, String)> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            let date_part = re.captures(&name)?.get(1)?.as_str().to_string();
            Some((e.path().to_path_buf(), date_part))
        })
        .collect();
    candidates.sort();

    for (path, date_part) in candidates {
        let parsed = NaiveDate::parse_from_str(&date_part, "%Y-%m-%d");
        let include = match (selector, parsed) {
            (DateSelector::Exact(date), Ok(file_date)) => file_date == date,
            (DateSelector::Exact(_), Err(_)) => false,
            (DateSelector::Trailing(days), Ok(file_date)) => {
                let cutoff = window_start(today, days);
                file_date >= cutoff && file_date <= today
            }
            (DateSelector::Trailing(_), Err(e)) => {
                log::warn!(
                    "Including {} despite unparsable date '{}' ({}); fail-open",
                    path.display(),
                    date_part,
                    e
                );
                selection.fail_open.push(path.clone());
                true
            }
        };
        if include {
            log::debug!("Selected {}", path.display());
            selection.files.push(path);
        }
    }

    selection
}
