use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::{AveragingPolicy, Metric};

/// Default number of rows between a subject label and its `Class` header row.
pub const DEFAULT_SUBJECT_LOOKBACK: u32 = 2;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Exam results KPIs and chart series for a cohort workbook
#[derive(Parser, Debug, Clone)]
#[command(
    name = "exam-dashboard",
    about = "Exam results KPIs and chart series for a cohort workbook",
    version
)]
pub struct Settings {
    /// Directory holding the cohort workbooks (year7.xlsx, year8.xlsx, ...)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Load this workbook or JSON grid directly, bypassing cohort lookup
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Cohort (year group) to load, e.g. 7 for year7.xlsx
    #[arg(long)]
    pub year: Option<String>,

    /// Subject for the per-class chart (defaults to the first subject)
    #[arg(long)]
    pub subject: Option<String>,

    /// Metric shown in the chart series
    #[arg(long, default_value = "pct1_6", value_parser = ["pct1_6", "pct1_8"])]
    pub metric: String,

    /// Averaging policy for the overall percentage KPIs
    #[arg(long, default_value = "weighted", value_parser = ["weighted", "simple"])]
    pub averaging: String,

    /// Rows between the subject label and its header row (1-20)
    #[arg(long, default_value = "2", value_parser = clap::value_parser!(u32).range(1..=20))]
    pub lookback: u32,

    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Logging level
    #[arg(long, default_value = "WARNING", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.exam-dashboard/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub averaging: Option<String>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".exam-dashboard").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path, creating parent
    /// directories if needed.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation; accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!(error = %e, "failed to clear saved configuration");
            }
            return Self::apply_debug_flag(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins over persisted values.
        if !is_arg_explicitly_set(&matches, "metric") {
            if let Some(v) = last.metric.filter(|m| m.parse::<Metric>().is_ok()) {
                settings.metric = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "averaging") {
            if let Some(v) = last.averaging.filter(|a| a.parse::<AveragingPolicy>().is_ok()) {
                settings.averaging = v;
            }
        }
        if settings.data_dir.is_none() {
            settings.data_dir = last.data_dir;
        }
        // An explicit file load is not a cohort selection, so the saved year
        // only applies when neither is given.
        if settings.year.is_none() && settings.file.is_none() {
            settings.year = last.year;
        }
        if settings.subject.is_none() {
            settings.subject = last.subject;
        }

        settings = Self::apply_debug_flag(settings);

        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            tracing::warn!(error = %e, "failed to persist last-used parameters");
        }

        settings
    }

    /// Typed metric selector. Falls back to the default on an unknown value.
    pub fn metric(&self) -> Metric {
        self.metric.parse().unwrap_or_default()
    }

    /// Typed averaging policy. Falls back to the default on an unknown value.
    pub fn averaging_policy(&self) -> AveragingPolicy {
        self.averaging.parse().unwrap_or_default()
    }

    /// Whether JSON output was requested.
    pub fn wants_json(&self) -> bool {
        self.format == "json"
    }

    /// `--debug` overrides the log level.
    fn apply_debug_flag(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            data_dir: s.data_dir.clone(),
            year: s.year.clone(),
            subject: s.subject.clone(),
            metric: Some(s.metric.clone()),
            averaging: Some(s.averaging.clone()),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
