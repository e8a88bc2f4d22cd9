//! Dashboard session state.
//!
//! [`DashboardSession`] owns the currently loaded dataset together with the
//! user's subject and metric selection. Every load replaces the dataset in
//! full: the previous records are dropped before the new ones are installed,
//! and KPIs and series are always recomputed from the current records.

use std::path::Path;

use chrono::{DateTime, Utc};
use results_core::models::{AveragingPolicy, Grid, KpiEntry, Metric, Record, Series};
use results_data::aggregator::ResultsAggregator;
use results_data::analysis::{analyze_file, analyze_grid, AnalysisResult};
use results_data::catalog::CohortCatalog;
use results_data::extractor::BlockExtractor;

/// Message shown when a source decodes but contains no subject blocks.
pub const NO_RECORDS_MESSAGE: &str = "File loaded but contains no valid records.";

// ── LoadState ─────────────────────────────────────────────────────────────────

/// Outcome of the most recent load.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum LoadState {
    /// Nothing has been loaded yet, or the session was cleared.
    #[default]
    Empty,
    /// A dataset with at least one record is installed.
    Loaded,
    /// The source was read but extraction found no records.
    NoRecords,
    /// The source could not be read.
    Failed(String),
}

impl LoadState {
    /// Placeholder text for states that have no data to display.
    pub fn placeholder(&self) -> Option<&str> {
        match self {
            LoadState::Empty => Some("No data loaded."),
            LoadState::Loaded => None,
            LoadState::NoRecords => Some(NO_RECORDS_MESSAGE),
            LoadState::Failed(message) => Some(message),
        }
    }
}

// ── Dataset ───────────────────────────────────────────────────────────────────

/// One loaded dataset. Immutable once installed.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Cohort label when the dataset was loaded through the catalogue.
    pub cohort: Option<String>,
    /// Pipeline output, including the records.
    pub analysis: AnalysisResult,
    pub loaded_at: DateTime<Utc>,
}

// ── DashboardSession ──────────────────────────────────────────────────────────

/// Explicit owner of all dashboard state.
///
/// # Example
/// ```no_run
/// use results_runtime::session::DashboardSession;
/// use results_core::models::{AveragingPolicy, Metric};
/// use results_data::extractor::BlockExtractor;
///
/// let mut session = DashboardSession::new(BlockExtractor::default(), AveragingPolicy::Weighted);
/// session.load_file(std::path::Path::new("assets/year7.xlsx"));
/// session.set_metric(Metric::Pct1_8);
/// for kpi in session.kpis() {
///     println!("{}: {}", kpi.label, kpi.value);
/// }
/// ```
#[derive(Debug)]
pub struct DashboardSession {
    extractor: BlockExtractor,
    policy: AveragingPolicy,
    metric: Metric,
    dataset: Option<Dataset>,
    state: LoadState,
    subjects: Vec<String>,
    selected_subject: Option<String>,
}

impl DashboardSession {
    pub fn new(extractor: BlockExtractor, policy: AveragingPolicy) -> Self {
        Self {
            extractor,
            policy,
            metric: Metric::default(),
            dataset: None,
            state: LoadState::Empty,
            subjects: Vec::new(),
            selected_subject: None,
        }
    }

    // ── Loading ───────────────────────────────────────────────────────────

    /// Replace the dataset with the records extracted from `grid`.
    pub fn load_grid(&mut self, source: &str, grid: &Grid) -> &LoadState {
        let analysis = analyze_grid(source, grid, &self.extractor, self.policy);
        self.install(analysis, None)
    }

    /// Replace the dataset with the contents of the file at `path`.
    ///
    /// A read failure drops the previous dataset and records the error in
    /// [`LoadState::Failed`].
    pub fn load_file(&mut self, path: &Path) -> &LoadState {
        match analyze_file(path, &self.extractor, self.policy) {
            Ok(analysis) => self.install(analysis, None),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to load results file");
                self.fail(format!("Failed to load {}: {}", path.display(), e))
            }
        }
    }

    /// Replace the dataset with the workbook registered for `cohort`.
    pub fn load_cohort(&mut self, catalog: &CohortCatalog, cohort: &str) -> &LoadState {
        let label = cohort.trim().to_string();
        let outcome = catalog
            .path_for(&label)
            .and_then(|path| analyze_file(path, &self.extractor, self.policy));

        match outcome {
            Ok(analysis) => self.install(analysis, Some(label)),
            Err(e) => {
                tracing::warn!(cohort = %label, error = %e, "failed to load cohort");
                self.fail(format!("Failed to load file for Year {}", label))
            }
        }
    }

    /// Drop the current dataset and selection.
    pub fn clear(&mut self) {
        self.dataset = None;
        self.subjects.clear();
        self.selected_subject = None;
        self.state = LoadState::Empty;
    }

    fn install(&mut self, analysis: AnalysisResult, cohort: Option<String>) -> &LoadState {
        let previous_subject = self.selected_subject.take();
        self.clear();

        self.subjects = ResultsAggregator::subjects(&analysis.records);
        self.selected_subject = previous_subject
            .filter(|s| self.subjects.contains(s))
            .or_else(|| self.subjects.first().cloned());
        self.state = if analysis.has_records() {
            LoadState::Loaded
        } else {
            LoadState::NoRecords
        };

        tracing::debug!(
            source = %analysis.metadata.source,
            records = analysis.records.len(),
            subjects = self.subjects.len(),
            "dataset installed"
        );

        self.dataset = Some(Dataset {
            cohort,
            analysis,
            loaded_at: Utc::now(),
        });
        &self.state
    }

    fn fail(&mut self, message: String) -> &LoadState {
        self.clear();
        self.state = LoadState::Failed(message);
        &self.state
    }

    // ── Selection ─────────────────────────────────────────────────────────

    /// Select `subject` for the per-class series.
    ///
    /// Returns `false` and selects the first subject when `subject` is not
    /// part of the current dataset.
    pub fn select_subject(&mut self, subject: &str) -> bool {
        let wanted = subject.trim();
        if let Some(found) = self.subjects.iter().find(|s| s.as_str() == wanted) {
            self.selected_subject = Some(found.clone());
            true
        } else {
            self.selected_subject = self.subjects.first().cloned();
            false
        }
    }

    pub fn set_metric(&mut self, metric: Metric) {
        self.metric = metric;
    }

    pub fn set_policy(&mut self, policy: AveragingPolicy) {
        self.policy = policy;
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    /// Records of the current dataset; empty when nothing is loaded.
    pub fn records(&self) -> &[Record] {
        self.dataset
            .as_ref()
            .map(|d| d.analysis.records.as_slice())
            .unwrap_or_default()
    }

    /// Distinct subjects of the current dataset, in first-seen order.
    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    pub fn selected_subject(&self) -> Option<&str> {
        self.selected_subject.as_deref()
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn policy(&self) -> AveragingPolicy {
        self.policy
    }

    // ── Derived views ─────────────────────────────────────────────────────

    /// The four KPI entries for the current records under the current policy.
    pub fn kpis(&self) -> [KpiEntry; 4] {
        ResultsAggregator::compute_kpis(self.records(), self.policy)
    }

    /// Per-class series for the selected subject and metric.
    pub fn class_series(&self) -> Series {
        match self.selected_subject.as_deref() {
            Some(subject) => {
                ResultsAggregator::compute_class_series(self.records(), subject, self.metric)
            }
            None => Series::default(),
        }
    }

    /// Per-subject comparison series for the selected metric.
    pub fn subject_series(&self) -> Series {
        ResultsAggregator::compute_subject_series(self.records(), self.metric)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
