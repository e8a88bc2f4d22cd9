//! Cohort workbook discovery.
//!
//! Each cohort (year group) lives in its own file named after the year,
//! e.g. `year7.xlsx` or `Year 10.json`. The catalogue maps cohort labels to
//! those files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use results_core::error::{Result, ResultsError};
use tracing::{debug, warn};

use crate::reader::is_supported;

fn cohort_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^year[\s_-]*(\d{1,2})$").expect("regex is valid"))
}

/// Parse a cohort selector such as `"7"`, `"year7"` or `"Year 10"`.
pub fn parse_cohort(label: &str) -> Option<u32> {
    let trimmed = label.trim();
    if let Ok(year) = trimmed.parse::<u32>() {
        return Some(year);
    }
    cohort_pattern()
        .captures(trimmed)
        .and_then(|caps| caps[1].parse().ok())
}

/// Cohort label → workbook path, ordered by year.
#[derive(Debug, Clone, Default)]
pub struct CohortCatalog {
    entries: BTreeMap<u32, PathBuf>,
}

impl CohortCatalog {
    /// Walk `data_dir` for cohort files.
    ///
    /// Files are visited in path order; when two files name the same cohort
    /// the first one wins.
    pub fn discover(data_dir: &Path) -> Result<Self> {
        if !data_dir.is_dir() {
            return Err(ResultsError::DataPathNotFound(data_dir.to_path_buf()));
        }

        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(data_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file() && is_supported(entry.path()))
            .map(|entry| entry.into_path())
            .collect();
        files.sort();

        let mut catalog = Self::default();
        for path in files {
            let Some(year) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| cohort_pattern().captures(stem.trim()))
                .and_then(|caps| caps[1].parse::<u32>().ok())
            else {
                continue;
            };

            if let Some(existing) = catalog.entries.get(&year) {
                warn!(
                    cohort = year,
                    kept = %existing.display(),
                    ignored = %path.display(),
                    "duplicate cohort file"
                );
                continue;
            }
            catalog.entries.insert(year, path);
        }

        debug!(
            cohorts = catalog.entries.len(),
            dir = %data_dir.display(),
            "cohort catalogue built"
        );
        Ok(catalog)
    }

    /// Build a catalogue from explicit `(year, path)` pairs.
    pub fn from_entries(entries: impl IntoIterator<Item = (u32, PathBuf)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Path of the workbook for `cohort`.
    pub fn path_for(&self, cohort: &str) -> Result<&Path> {
        parse_cohort(cohort)
            .and_then(|year| self.entries.get(&year))
            .map(PathBuf::as_path)
            .ok_or_else(|| ResultsError::UnknownCohort(cohort.trim().to_string()))
    }

    /// Cohort labels in ascending year order.
    pub fn cohorts(&self) -> Vec<String> {
        self.entries.keys().map(u32::to_string).collect()
    }

    /// The lowest year, used when no cohort was requested.
    pub fn default_cohort(&self) -> Option<String> {
        self.entries.keys().next().map(u32::to_string)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
