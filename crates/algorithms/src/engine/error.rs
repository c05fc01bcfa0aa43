//! Error and outcome types of the geometry engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome classes reported by engine operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationResult {
    /// Completed and produced a genuine change
    Success,
    /// Well-formed request that changed nothing
    NothingHappened,
    /// Receiver geometry absent, invalid or of the wrong dimension
    InvalidBaseGeometry,
    /// Malformed or dimensionally wrong operand
    InvalidInput,
    /// Internal noding produced no usable result
    NodedGeometryError,
    /// The computational-geometry backend failed
    EngineError,
}

/// Error raised by the geometry engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid input geometry: {0}")]
    InvalidInput(String),

    #[error("Invalid base geometry: {0}")]
    InvalidBaseGeometry(String),

    #[error("Noding produced no usable result")]
    NodedGeometryError,

    #[error("Operation had no effect")]
    NothingHappened,

    #[error("Geometry engine error: {0}")]
    Engine(String),

    #[error(transparent)]
    Core(#[from] topotrace_core::Error),
}

impl EngineError {
    /// Outcome class of this error
    pub fn outcome(&self) -> OperationResult {
        match self {
            EngineError::InvalidInput(_) | EngineError::Core(_) => OperationResult::InvalidInput,
            EngineError::InvalidBaseGeometry(_) => OperationResult::InvalidBaseGeometry,
            EngineError::NodedGeometryError => OperationResult::NodedGeometryError,
            EngineError::NothingHappened => OperationResult::NothingHappened,
            EngineError::Engine(_) => OperationResult::EngineError,
        }
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Outcome class of any engine result
pub fn outcome_of<T>(result: &Result<T>) -> OperationResult {
    match result {
        Ok(_) => OperationResult::Success,
        Err(e) => e.outcome(),
    }
}
