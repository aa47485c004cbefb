use crate::report::ScoringWeights;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub compare: CompareConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where datasets are read from and reports are written to
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// Root of per-method result directories (`<dir>/<method>/...`).
    #[serde(default = "default_method_results_dir")]
    pub method_results_dir: PathBuf,
    /// Root of per-model result directories for the LLM comparison phase.
    #[serde(default = "default_model_results_dir")]
    pub model_results_dir: PathBuf,
    /// Root of line-delimited metrics logs (`<dir>/<category>/*.jsonl`).
    #[serde(default = "default_metrics_dir")]
    pub metrics_dir: PathBuf,
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            method_results_dir: default_method_results_dir(),
            model_results_dir: default_model_results_dir(),
            metrics_dir: default_metrics_dir(),
            reports_dir: default_reports_dir(),
            export_dir: default_export_dir(),
        }
    }
}

/// The fixed, ordered lists of competitors per comparison phase.
/// Order matters: ties go to the first-listed entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CompareConfig {
    #[serde(default = "default_methods")]
    pub methods: Vec<String>,
    #[serde(default = "default_models")]
    pub models: Vec<String>,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            methods: default_methods(),
            models: default_models(),
        }
    }
}

/// Composite score weights, keyed by metric name
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_weights")]
    pub weights: BTreeMap<String, f64>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: default_weights(),
        }
    }
}

/// Bulk export defaults
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Trailing window used when neither `--date` nor `--days` is given.
    #[serde(default = "default_window_days")]
    pub default_days: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_days: default_window_days(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_method_results_dir() -> PathBuf {
    PathBuf::from("test_results/methods")
}

fn default_model_results_dir() -> PathBuf {
    PathBuf::from("test_results/models")
}

fn default_metrics_dir() -> PathBuf {
    PathBuf::from("metrics")
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("exports")
}

fn default_methods() -> Vec<String> {
    vec!["bm25".to_string(), "vector".to_string(), "hybrid".to_string()]
}

fn default_models() -> Vec<String> {
    vec![
        "gpt-4o-mini".to_string(),
        "claude-3-haiku".to_string(),
        "llama3".to_string(),
    ]
}

fn default_weights() -> BTreeMap<String, f64> {
    ScoringWeights::default()
        .iter()
        .map(|(kind, weight)| (kind.key().to_string(), weight))
        .collect()
}

fn default_window_days() -> u32 {
    7
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in RAGBENCH_CONFIG environment variable (must exist)
    /// 2. ./config.toml in current directory
    /// 3. Built-in defaults when ./config.toml is absent
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        if let Ok(path) = std::env::var("RAGBENCH_CONFIG") {
            return Self::from_file(Path::new(&path));
        }

        let default_path = PathBuf::from("config.toml");
        if default_path.exists() {
            return Self::from_file(&default_path);
        }

        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a specific config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        check_names("compare.methods", &self.compare.methods)?;
        check_names("compare.models", &self.compare.models)?;

        self.scoring_weights()?;

        if self.export.default_days == 0 {
            anyhow::bail!("export.default_days must be greater than 0");
        }

        Ok(())
    }

    /// Composite score weights parsed from `[scoring.weights]`
    pub fn scoring_weights(&self) -> Result<ScoringWeights> {
        ScoringWeights::from_map(&self.scoring.weights).context("Invalid [scoring.weights]")
    }
}

fn check_names(key: &str, names: &[String]) -> Result<()> {
    if names.is_empty() {
        anyhow::bail!("{} must list at least one entry", key);
    }
    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            anyhow::bail!("{} contains an empty name", key);
        }
        if !seen.insert(name.as_str()) {
            anyhow::bail!("{} lists '{}' more than once", key, name);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::MetricKind;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    fn with_config_env(config_path: &str, f: impl FnOnce()) {
        let original = std::env::var("RAGBENCH_CONFIG").ok();
        std::env::set_var("RAGBENCH_CONFIG", config_path);
        f();
        std::env::remove_var("RAGBENCH_CONFIG");
        if let Some(val) = original {
            std::env::set_var("RAGBENCH_CONFIG", val);
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.compare.methods, vec!["bm25", "vector", "hybrid"]);
        assert_eq!(config.export.default_days, 7);
        let weights = config.scoring_weights().unwrap();
        assert!((weights.get(MetricKind::PrecisionAt5) - 0.4).abs() < 1e-12);
        assert!((weights.get(MetricKind::Coverage) - 0.1).abs() < 1e-12);
        assert_eq!(weights.get(MetricKind::OverallPrecision), 0.0);
    }

    #[test]
    fn test_config_load_from_env_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
[paths]
method_results_dir = "results/methods"

[compare]
methods = ["keyword", "semantic"]

[scoring.weights]
precision_at_5 = 0.5
mrr = 0.5

[logging]
level = "debug"
"#,
        )
        .unwrap();
        with_config_env(config_path.to_str().unwrap(), || {
            let config = Config::load();
            assert!(config.is_ok(), "Config::load() failed: {:?}", config.err());
            let config = config.unwrap();
            assert_eq!(config.logging.level, "debug");
            assert_eq!(config.compare.methods, vec!["keyword", "semantic"]);
            assert_eq!(config.compare.models.len(), 3);
            assert_eq!(
                config.paths.method_results_dir,
                PathBuf::from("results/methods")
            );
            let weights = config.scoring_weights().unwrap();
            assert!((weights.get(MetricKind::Mrr) - 0.5).abs() < 1e-12);
            assert_eq!(weights.get(MetricKind::SuccessRate), 0.0);
        });
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        with_config_env("nonexistent.toml", || {
            let config = Config::load();
            assert!(config.is_err());
        });
    }

    #[test]
    fn test_rejects_unknown_weight_key() {
        let mut config = Config::default();
        config.scoring.weights.insert("recall_at_10".to_string(), 0.2);
        let err = config.validate().unwrap_err();
        assert!(format!("{:#}", err).contains("recall_at_10"));
    }

    #[test]
    fn test_rejects_negative_weight() {
        let mut config = Config::default();
        config.scoring.weights.insert("mrr".to_string(), -0.3);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_methods() {
        let mut config = Config::default();
        config.compare.methods = vec!["bm25".to_string(), "bm25".to_string()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_rejects_zero_window() {
        let mut config = Config::default();
        config.export.default_days = 0;
        assert!(config.validate().is_err());
    }
}
