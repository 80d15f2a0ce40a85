// Error types for the dashboard.
//
// `SchemaError` and `ConfigError` are the two failures the pipeline itself
// can produce; everything else (CSV, JSON, I/O) bubbles up through the
// umbrella `DashboardError`. An empty intermediate result is never an error.
use thiserror::Error;

/// A requested column is absent or has the wrong semantic type. Fatal for
/// the pipeline run that asked for it; no partial series is returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("column '{column}' not found in dataset '{dataset}'")]
    MissingColumn { dataset: String, column: String },
    #[error("column '{column}' in dataset '{dataset}' is not numeric")]
    NotNumeric { dataset: String, column: String },
}

/// An invalid chart parameter, rejected before any computation starts.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("marker scale must be positive and finite, got {0}")]
    InvalidScale(f64),
    #[error("top-N truncation must keep at least one row")]
    ZeroTruncation,
}

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
