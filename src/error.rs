//! Custom error types for researchgap.
//!
//! This module defines all error types used throughout the pipeline.
//! All fallible functions return `Result<T, PipelineError>` instead of using `unwrap()`.
//!
//! Segment-level parse failures are deliberately NOT represented here: a
//! citation segment that cannot be fully parsed is dropped and logged by the
//! parser (see [`crate::parser::ParseOutcome`]), never propagated as an error.

use thiserror::Error;

/// Main error type for researchgap operations.
///
/// Uses `thiserror` for ergonomic error handling and automatic `Display` implementation.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Object store unreachable, HTTP failure, or object missing
    #[error("Transport error: {0}")]
    Transport(String),

    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Fetched corpus not decodable as text
    #[error("Decode error: {0}")]
    Decode(String),

    /// Topic-modeling call failed
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Filesystem write failed during export
    #[error("Export error: {0}")]
    Export(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias using `PipelineError`
pub type Result<T> = std::result::Result<T, PipelineError>;
