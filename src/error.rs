//! Error types for the sparkify-etl library.
//!
//! Every failure in the pipeline is fatal for the run, so the variants exist to
//! produce a precise terminal message rather than to drive recovery.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading song and log files.
#[derive(Error, Debug)]
pub enum EtlError {
    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory traversal errors
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// A record in a source file is not valid JSON or does not match the expected shape
    #[error("Malformed record in {}: {source}", path.display())]
    Json {
        /// File containing the bad record
        path: PathBuf,
        /// Underlying parser error
        #[source]
        source: serde_json::Error,
    },

    /// A song metadata file contained no records
    #[error("No song record found in {}", .0.display())]
    EmptySongFile(PathBuf),

    /// A play event lacks a field required to build its rows
    #[error("Missing field `{field}` in play event {index} of {}", path.display())]
    MissingField {
        /// File containing the event
        path: PathBuf,
        /// Zero-based index of the event within the file
        index: usize,
        /// JSON field name
        field: &'static str,
    },

    /// Epoch milliseconds outside the representable range
    #[error("Invalid event timestamp: {0}")]
    InvalidTimestamp(i64),

    /// SQLite errors
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// PostgreSQL errors
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Convenience type alias for Result with `EtlError`
pub type Result<T> = std::result::Result<T, EtlError>;

impl From<config::ConfigError> for EtlError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
