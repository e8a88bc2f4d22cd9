//! Shared models, error type, settings and formatting helpers for the exam
//! results dashboard.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;

pub use error::{Result, ResultsError};
