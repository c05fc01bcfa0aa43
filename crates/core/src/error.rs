//! Error types for topotrace

use thiserror::Error;

/// Main error type for topotrace core operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid WKT at offset {offset}: {message}")]
    InvalidWkt { offset: usize, message: String },

    #[error("Coordinate transform failed ({from} -> {to}): {reason}")]
    Transform {
        from: String,
        to: String,
        reason: String,
    },

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Unknown feature id: {0}")]
    UnknownFeature(u64),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for topotrace core operations
pub type Result<T> = std::result::Result<T, Error>;
