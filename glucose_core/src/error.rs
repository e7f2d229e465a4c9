//! Error types for the glucose_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for glucose_core operations
///
/// Only the I/O boundary (config, bundle and CSV loading) produces these.
/// The evaluation engines never fail; they degrade to fewer findings.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Insulin catalogue validation error
    #[error("Catalogue validation error: {0}")]
    Catalogue(String),

    /// Malformed input bundle
    #[error("Input error: {0}")]
    Input(String),

    /// Field-level parse failure surfaced at a strict boundary
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Why a single raw field could not be turned into a typed value.
///
/// The normalizer uses these to exclude rows; they are reported, never thrown.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error, serde::Serialize)]
#[serde(tag = "kind", content = "input", rename_all = "snake_case")]
pub enum ParseError {
    #[error("value is empty")]
    Empty,

    #[error("not a number: {0:?}")]
    NotNumeric(String),

    #[error("number is not finite")]
    NotFinite,

    #[error("unrecognised timestamp: {0:?}")]
    BadTimestamp(String),
}
