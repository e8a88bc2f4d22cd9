//! Cohort KPIs and chart series over extracted records.
//!
//! Cohort-level figures are computed from the subjects' `Overall` rows. When
//! a dataset has no `Overall` rows at all, every record is used instead so a
//! sheet without summary rows still produces meaningful numbers.

use std::collections::{HashMap, HashSet};

use results_core::formatting::safe_ratio;
use results_core::models::{AveragingPolicy, KpiEntry, KpiValue, Metric, Record, Series};

/// KPI labels, in display order.
pub const KPI_LABELS: [&str; 4] = [
    "Overall % 1–6",
    "Overall % 1–8",
    "Total Candidates",
    "No. of Subjects",
];

// ── CohortSummary ─────────────────────────────────────────────────────────────

/// Typed cohort figures behind the four KPI entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct CohortSummary {
    pub overall_pct1_6: f64,
    pub overall_pct1_8: f64,
    pub total_candidates: u64,
    pub subject_count: usize,
}

impl CohortSummary {
    /// The four KPI entries in their fixed display order.
    pub fn to_kpis(&self) -> [KpiEntry; 4] {
        [
            KpiEntry::new(KPI_LABELS[0], KpiValue::Percent(self.overall_pct1_6)),
            KpiEntry::new(KPI_LABELS[1], KpiValue::Percent(self.overall_pct1_8)),
            KpiEntry::new(KPI_LABELS[2], KpiValue::Count(self.total_candidates)),
            KpiEntry::new(KPI_LABELS[3], KpiValue::Count(self.subject_count as u64)),
        ]
    }
}

// ── ResultsAggregator ─────────────────────────────────────────────────────────

/// Stateless helper that reduces records to KPIs and chart series.
pub struct ResultsAggregator;

impl ResultsAggregator {
    /// Compute the four KPI entries: Overall % 1–6, Overall % 1–8,
    /// Total Candidates, No. of Subjects.
    ///
    /// An empty record list yields zeros throughout.
    pub fn compute_kpis(records: &[Record], policy: AveragingPolicy) -> [KpiEntry; 4] {
        Self::summarize(records, policy).to_kpis()
    }

    /// Typed counterpart of [`compute_kpis`](Self::compute_kpis).
    pub fn summarize(records: &[Record], policy: AveragingPolicy) -> CohortSummary {
        CohortSummary {
            overall_pct1_6: Self::overall_percentage(records, Metric::Pct1_6, policy),
            overall_pct1_8: Self::overall_percentage(records, Metric::Pct1_8, policy),
            total_candidates: Self::total_candidates(records),
            subject_count: Self::subject_count(records),
        }
    }

    /// Cohort size, avoiding one count per subject.
    ///
    /// Uses the distinct positive Overall totals: a single value when all
    /// subjects agree, otherwise the largest. Without any positive Overall
    /// total, falls back to summing `total` over the basis rows.
    pub fn total_candidates(records: &[Record]) -> u64 {
        let mut distinct: Vec<u32> = overall_rows(records)
            .map(|r| r.total)
            .filter(|&t| t > 0)
            .collect();
        distinct.sort_unstable();
        distinct.dedup();

        match distinct.last() {
            Some(&largest) => u64::from(largest),
            None => basis_rows(records).map(|r| u64::from(r.total)).sum(),
        }
    }

    /// Cohort-level percentage for `metric` under `policy`.
    ///
    /// Weighted: Σ(pct × total) / Σ(total). Simple: mean of pct. Zero
    /// denominators give `0.0`.
    pub fn overall_percentage(records: &[Record], metric: Metric, policy: AveragingPolicy) -> f64 {
        let (numerator, denominator) = match policy {
            AveragingPolicy::Weighted => basis_rows(records).fold((0.0, 0.0), |(num, den), r| {
                let weight = f64::from(r.total);
                (num + r.metric(metric) * weight, den + weight)
            }),
            AveragingPolicy::Simple => basis_rows(records)
                .fold((0.0, 0.0), |(sum, count), r| (sum + r.metric(metric), count + 1.0)),
        };
        safe_ratio(numerator, denominator)
    }

    /// Number of distinct subjects among the basis rows.
    pub fn subject_count(records: &[Record]) -> usize {
        basis_rows(records)
            .map(|r| r.subject.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Distinct subjects in first-seen order.
    pub fn subjects(records: &[Record]) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        records
            .iter()
            .filter(|r| seen.insert(r.subject.as_str()))
            .map(|r| r.subject.clone())
            .collect()
    }

    /// Per-class values of `metric` for one subject, excluding Overall rows,
    /// in record order.
    pub fn compute_class_series(records: &[Record], subject: &str, metric: Metric) -> Series {
        let mut series = Series::default();
        for record in records
            .iter()
            .filter(|r| r.subject == subject && !r.is_overall())
        {
            series.push(record.class_name.clone(), record.metric(metric));
        }
        series
    }

    /// One value of `metric` per subject, in first-seen order.
    ///
    /// Prefers the subject's first Overall row; a subject without one uses
    /// its first class row.
    pub fn compute_subject_series(records: &[Record], metric: Metric) -> Series {
        let mut order: Vec<&str> = Vec::new();
        // subject → (value came from an Overall row, value)
        let mut chosen: HashMap<&str, (bool, f64)> = HashMap::new();

        for record in records {
            let subject = record.subject.as_str();
            let candidate = (record.is_overall(), record.metric(metric));
            match chosen.get_mut(subject) {
                None => {
                    order.push(subject);
                    chosen.insert(subject, candidate);
                }
                Some(current) if !current.0 && candidate.0 => *current = candidate,
                Some(_) => {}
            }
        }

        let mut series = Series::default();
        for subject in order {
            let (_, value) = chosen[subject];
            series.push(subject, value);
        }
        series
    }
}

// ── Row selection ─────────────────────────────────────────────────────────────

fn overall_rows(records: &[Record]) -> impl Iterator<Item = &Record> + '_ {
    records.iter().filter(|r| r.is_overall())
}

/// Overall rows, or every record when the dataset has no Overall rows.
fn basis_rows(records: &[Record]) -> impl Iterator<Item = &Record> + '_ {
    let has_overall = records.iter().any(Record::is_overall);
    records.iter().filter(move |r| !has_overall || r.is_overall())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
