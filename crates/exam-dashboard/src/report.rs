//! Text and JSON rendering of a dashboard session.

use std::fmt;

use results_core::formatting::format_percent;
use results_core::models::{AveragingPolicy, KpiEntry, Metric, Series};
use results_data::analysis::AnalysisMetadata;
use results_runtime::session::{DashboardSession, LoadState};
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

/// Width of a full (100 %) bar, in cells.
const BAR_WIDTH: usize = 40;
const BAR_GLYPH: char = '█';

// ── DashboardReport ───────────────────────────────────────────────────────────

/// Everything one dashboard render shows, detached from the session.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub cohort: Option<String>,
    /// Cohorts available in the data directory.
    pub cohorts: Vec<String>,
    pub state: LoadState,
    pub metric: Metric,
    pub averaging: AveragingPolicy,
    pub subjects: Vec<String>,
    pub selected_subject: Option<String>,
    pub kpis: Vec<KpiEntry>,
    pub class_series: Series,
    pub subject_series: Series,
    pub metadata: Option<AnalysisMetadata>,
}

impl DashboardReport {
    pub fn from_session(session: &DashboardSession, cohorts: Vec<String>) -> Self {
        let dataset = session.dataset();
        Self {
            cohort: dataset.and_then(|d| d.cohort.clone()),
            cohorts,
            state: session.state().clone(),
            metric: session.metric(),
            averaging: session.policy(),
            subjects: session.subjects().to_vec(),
            selected_subject: session.selected_subject().map(str::to_string),
            kpis: session.kpis().to_vec(),
            class_series: session.class_series(),
            subject_series: session.subject_series(),
            metadata: dataset.map(|d| d.analysis.metadata.clone()),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Aligned text: KPI cards, then the two bar charts.
impl fmt::Display for DashboardReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = match &self.cohort {
            Some(cohort) => format!("Exam Results: Year {}", cohort),
            None => "Exam Results".to_string(),
        };
        writeln!(f, "{}", title)?;
        writeln!(f, "{}", "=".repeat(title.width()))?;
        if let Some(meta) = &self.metadata {
            writeln!(f, "Source:    {}", meta.source)?;
        }
        if !self.cohorts.is_empty() {
            writeln!(f, "Cohorts:   {}", self.cohorts.join(", "))?;
        }
        writeln!(
            f,
            "Metric:    {}    Averaging: {}",
            self.metric.label(),
            self.averaging
        )?;
        writeln!(f)?;

        if let Some(message) = self.state.placeholder() {
            return writeln!(f, "{}", message);
        }

        let label_width = self.kpis.iter().map(|k| k.label.width()).max().unwrap_or(0);
        for kpi in &self.kpis {
            writeln!(
                f,
                "  {}  {:>8}",
                pad_right(&kpi.label, label_width),
                kpi.value.to_string()
            )?;
        }
        writeln!(f)?;

        let subject = self.selected_subject.as_deref().unwrap_or("-");
        writeln!(f, "{} by class: {}", self.metric.label(), subject)?;
        write_bars(f, &self.class_series)?;
        writeln!(f)?;

        writeln!(f, "{} by subject", self.metric.overall_label())?;
        write_bars(f, &self.subject_series)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn write_bars(f: &mut fmt::Formatter<'_>, series: &Series) -> fmt::Result {
    if series.is_empty() {
        return writeln!(f, "  (no data)");
    }
    let label_width = series.labels.iter().map(|l| l.width()).max().unwrap_or(0);
    for (label, value) in series.iter() {
        writeln!(
            f,
            "  {}  {}  {:>6}",
            pad_right(label, label_width),
            pad_right(&bar(value), BAR_WIDTH),
            format_percent(value, 1)
        )?;
    }
    Ok(())
}

/// Horizontal bar on a 0–100 scale.
fn bar(percent: f64) -> String {
    let clamped = if percent.is_finite() {
        percent.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let filled = (clamped / 100.0 * BAR_WIDTH as f64).round() as usize;
    BAR_GLYPH.to_string().repeat(filled)
}

/// Pad `text` with spaces to `width` display columns.
fn pad_right(text: &str, width: usize) -> String {
    let padding = width.saturating_sub(text.width());
    format!("{}{}", text, " ".repeat(padding))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
