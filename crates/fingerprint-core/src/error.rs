use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors produced by the fingerprint pipeline.
///
/// Per-line and per-fragment problems are not represented here; those are
/// skipped and counted where they occur.
#[derive(Error, Debug)]
pub enum FingerprintError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A scan log that was asked for does not exist.
    #[error("Log file not found: {0}")]
    LogNotFound(PathBuf),

    /// No scan logs were found under the given directory.
    #[error("No log files found in {0}")]
    NoLogFiles(PathBuf),

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A CSV table could not be written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A session name was empty or otherwise unusable.
    #[error("Invalid session name: {0:?}")]
    InvalidSessionName(String),

    /// The serial link to the scanning device failed.
    #[error("Serial error: {0}")]
    Serial(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the fingerprint crates.
pub type Result<T> = std::result::Result<T, FingerprintError>;
