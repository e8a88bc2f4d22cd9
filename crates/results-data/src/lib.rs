//! Extraction and aggregation engine for the exam results dashboard.
//!
//! Locates subject blocks in raw sheet grids, turns them into records,
//! reduces those records to cohort KPIs and chart series, and loads grids
//! from cohort workbooks.

pub mod aggregator;
pub mod analysis;
pub mod catalog;
pub mod extractor;
pub mod reader;

pub use results_core as core;
