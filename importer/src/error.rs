use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for import operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// Fatal errors. Any of these ends the run before or during the inference
/// pass; nothing after them is written.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Header name '{0}' appears more than once")]
    DuplicateHeaderName(String),

    #[error("You must have at least one field (non-tag) column")]
    MissingFieldColumn,

    #[error("Timestamp column ({column}) does not match any header ({headers})")]
    MissingTimestampColumn { column: String, headers: String },

    #[error("Tag names ({tags}) do not all have matching headers ({headers})")]
    UnmatchedTagColumn { tags: String, headers: String },

    #[error("No type found in the first {window} rows for column '{column}'")]
    UnresolvedColumnType { column: String, window: usize },

    #[error("Input has no header row")]
    EmptyInput,

    #[error("Invalid timestamp format '{format}': {reason}")]
    InvalidTimestampFormat { format: String, reason: String },

    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ImportError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        ImportError::InvalidConfig(msg.into())
    }
}

/// Errors scoped to a single data row. The row is skipped and the run
/// continues.
#[derive(Error, Debug, PartialEq)]
pub enum RowError {
    #[error("row {row} produced no fields")]
    NoFields { row: u64 },
}
