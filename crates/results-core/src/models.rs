use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ResultsError;
use crate::formatting::{format_number, format_percent};

/// Reserved class label for the subject-wide summary row.
pub const OVERALL_LABEL: &str = "Overall";

// ── Cell ──────────────────────────────────────────────────────────────────────

/// A single value in a raw sheet grid.
///
/// JSON grids map `null` to [`Cell::Empty`], booleans, numbers and strings to
/// the matching variant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Cell {
    /// `true` for empty cells and text that is empty after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Bool(_) | Cell::Number(_) => false,
        }
    }

    /// Stringify the cell and trim surrounding whitespace.
    ///
    /// Whole numbers render without a fractional part (`42.0` → `"42"`).
    pub fn to_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
        }
    }

    /// Coerce the cell to a finite number.
    ///
    /// Empty cells, unparsable text and non-finite values all yield `0.0`.
    pub fn to_number(&self) -> f64 {
        let value = match self {
            Cell::Empty => 0.0,
            Cell::Number(n) => *n,
            Cell::Bool(true) => 1.0,
            Cell::Bool(false) => 0.0,
            Cell::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        };
        if value.is_finite() {
            value
        } else {
            0.0
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Number(n as f64)
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Cell::Bool(b)
    }
}

// ── Grid ──────────────────────────────────────────────────────────────────────

/// A read-only 2-D grid of cells as decoded from a sheet.
///
/// Rows may have different lengths; a missing cell reads as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Row `index`, or `None` when out of bounds.
    pub fn row(&self, index: usize) -> Option<&[Cell]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Cell at `(row, col)`, or `None` when either index is out of bounds.
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl From<Vec<Vec<Cell>>> for Grid {
    fn from(rows: Vec<Vec<Cell>>) -> Self {
        Self::new(rows)
    }
}

// ── Record ────────────────────────────────────────────────────────────────────

/// Per-grade candidate counts, best grade first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeCounts {
    #[serde(rename = "Astar")]
    pub a_star: u32,
    #[serde(rename = "A2")]
    pub a2: u32,
    #[serde(rename = "B3")]
    pub b3: u32,
    #[serde(rename = "B4")]
    pub b4: u32,
    #[serde(rename = "C5")]
    pub c5: u32,
    #[serde(rename = "C6")]
    pub c6: u32,
    #[serde(rename = "D7")]
    pub d7: u32,
    #[serde(rename = "E8")]
    pub e8: u32,
    #[serde(rename = "U")]
    pub u: u32,
}

/// One class's (or the subject-wide) result summary for one subject.
///
/// Band counts and percentages are taken as given from the sheet and never
/// recomputed from the grade buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub subject: String,
    #[serde(rename = "className")]
    pub class_name: String,
    pub total: u32,
    #[serde(flatten)]
    pub grades: GradeCounts,
    pub total1_6: u32,
    pub pct1_6: f64,
    pub total1_8: u32,
    pub pct1_8: f64,
}

impl Record {
    /// Whether this is the subject-wide summary row (case-insensitive).
    pub fn is_overall(&self) -> bool {
        self.class_name.eq_ignore_ascii_case(OVERALL_LABEL)
    }

    /// Percentage for the selected grade band.
    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Pct1_6 => self.pct1_6,
            Metric::Pct1_8 => self.pct1_8,
        }
    }
}

// ── Metric ────────────────────────────────────────────────────────────────────

/// The two percentage measures tracked per record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    /// Share of candidates scoring within grade band 1–6.
    #[default]
    #[serde(rename = "pct1_6")]
    Pct1_6,
    /// Share of candidates scoring within grade band 1–8.
    #[serde(rename = "pct1_8")]
    Pct1_8,
}

impl Metric {
    /// Selector string as used on the command line and in JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Pct1_6 => "pct1_6",
            Metric::Pct1_8 => "pct1_8",
        }
    }

    /// Short series label, e.g. `"% 1–6"`.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Pct1_6 => "% 1–6",
            Metric::Pct1_8 => "% 1–8",
        }
    }

    /// Label used for cohort-level figures, e.g. `"Overall % 1–6"`.
    pub fn overall_label(&self) -> &'static str {
        match self {
            Metric::Pct1_6 => "Overall % 1–6",
            Metric::Pct1_8 => "Overall % 1–8",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = ResultsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pct1_6" => Ok(Metric::Pct1_6),
            "pct1_8" => Ok(Metric::Pct1_8),
            other => Err(ResultsError::InvalidMetric(other.to_string())),
        }
    }
}

// ── AveragingPolicy ───────────────────────────────────────────────────────────

/// How the cohort-level band percentages are averaged across Overall rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AveragingPolicy {
    /// Each row's percentage weighted by its candidate total.
    #[default]
    Weighted,
    /// Unweighted mean of the row percentages.
    Simple,
}

impl AveragingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AveragingPolicy::Weighted => "weighted",
            AveragingPolicy::Simple => "simple",
        }
    }
}

impl fmt::Display for AveragingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AveragingPolicy {
    type Err = ResultsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weighted" => Ok(AveragingPolicy::Weighted),
            "simple" => Ok(AveragingPolicy::Simple),
            other => Err(ResultsError::InvalidPolicy(other.to_string())),
        }
    }
}

// ── KPI ───────────────────────────────────────────────────────────────────────

/// A displayable KPI value. Always finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum KpiValue {
    Percent(f64),
    Count(u64),
}

impl KpiValue {
    /// Numeric view of the value, for consumers that plot KPIs.
    pub fn as_f64(&self) -> f64 {
        match self {
            KpiValue::Percent(p) => *p,
            KpiValue::Count(c) => *c as f64,
        }
    }
}

impl fmt::Display for KpiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KpiValue::Percent(p) => f.write_str(&format_percent(*p, 1)),
            KpiValue::Count(c) => f.write_str(&format_number(*c as f64, 0)),
        }
    }
}

/// A labelled KPI, recomputed on every aggregation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiEntry {
    pub label: String,
    pub value: KpiValue,
}

impl KpiEntry {
    pub fn new(label: impl Into<String>, value: KpiValue) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

// ── Series ────────────────────────────────────────────────────────────────────

/// Parallel label / value vectors ready for a bar chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Series {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl Series {
    pub fn push(&mut self, label: impl Into<String>, value: f64) {
        self.labels.push(label.into());
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Iterate `(label, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
