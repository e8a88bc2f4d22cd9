//! Session layer for the exam results dashboard.
//!
//! Owns the loaded dataset and the user's selections, and derives KPIs and
//! chart series from them on demand.

pub mod session;

pub use results_core as core;
pub use results_data as data;
pub use session::{DashboardSession, Dataset, LoadState};
