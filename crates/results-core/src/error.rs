use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the exam results dashboard.
///
/// The extraction and aggregation engine itself is total and never returns
/// one of these; they originate in the loading and configuration layers.
#[derive(Error, Debug)]
pub enum ResultsError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A workbook was found but could not be decoded.
    #[error("Failed to open workbook {path}: {message}")]
    Workbook { path: PathBuf, message: String },

    /// The workbook decoded successfully but contains no worksheets.
    #[error("No sheets found in workbook {0}")]
    NoSheets(PathBuf),

    /// The file extension is not one of the supported grid sources.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(PathBuf),

    /// A JSON grid document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// No workbook is registered for the requested cohort.
    #[error("Unknown cohort: {0}")]
    UnknownCohort(String),

    /// The expected data directory does not exist.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// A metric selector is not one of `pct1_6` / `pct1_8`.
    #[error("Invalid metric: {0}")]
    InvalidMetric(String),

    /// An averaging policy name is not recognised.
    #[error("Invalid averaging policy: {0}")]
    InvalidPolicy(String),
}

/// Convenience alias used throughout the results crates.
pub type Result<T> = std::result::Result<T, ResultsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = ResultsError::FileRead {
            path: PathBuf::from("/assets/year7.xlsx"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/assets/year7.xlsx"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_workbook() {
        let err = ResultsError::Workbook {
            path: PathBuf::from("year8.xlsx"),
            message: "invalid zip header".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to open workbook year8.xlsx: invalid zip header"
        );
    }

    #[test]
    fn test_error_display_unknown_cohort() {
        let err = ResultsError::UnknownCohort("12".to_string());
        assert_eq!(err.to_string(), "Unknown cohort: 12");
    }

    #[test]
    fn test_error_display_unsupported_format() {
        let err = ResultsError::UnsupportedFormat(PathBuf::from("grades.txt"));
        assert_eq!(err.to_string(), "Unsupported file format: grades.txt");
    }

    #[test]
    fn test_error_display_invalid_metric() {
        let err = ResultsError::InvalidMetric("pct1_9".to_string());
        assert_eq!(err.to_string(), "Invalid metric: pct1_9");
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("[[1,").unwrap_err();
        let err: ResultsError = json_err.into();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }
}
