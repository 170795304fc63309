// src/utils/errors.rs
//! Error types for the engine
//!
//! Every fallible operation in the crate returns [`Result`]. The variants
//! follow the failure taxonomy callers act on:
//!
//! - **Abort**: the backend cannot proceed; stop scheduling on that evaluator
//! - **Shutdown**: the evaluator or event bus is already closed
//! - **Duplicate**: a batch contains the same logical request twice
//! - **Deadlock**: flush was called from the dispatch thread (latching)

use crate::model::AlgorithmRun;
use crate::utils::return_values;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, EngineError>;

/// Engine error type
#[derive(Error, Debug)]
pub enum EngineError {
    /// Backend could not complete the batch. Carries any outcomes that
    /// were already known when the failure happened.
    #[error("Target algorithm abort: {message}")]
    Abort {
        message: String,
        runs: Vec<AlgorithmRun>,
    },

    #[error("Target algorithm evaluator shutdown: {0}")]
    EvaluatorShutdown(String),

    #[error("Event manager has been shutdown")]
    EventBusShutdown,

    #[error("Duplicate run configurations in batch: {0}")]
    DuplicateRun(String),

    #[error("Deadlock detected: {0}")]
    Deadlock(String),

    #[error("Invalid algorithm run: {0}")]
    InvalidRun(String),

    #[error("Invalid parameter: {0}")]
    Parameter(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Abort without any partially known outcomes
    pub fn abort(message: impl Into<String>) -> Self {
        EngineError::Abort {
            message: message.into(),
            runs: Vec::new(),
        }
    }

    /// Whether the owning evaluator should stop receiving work
    pub fn is_abort(&self) -> bool {
        matches!(self, EngineError::Abort { .. })
    }

    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::Parameter(_) | EngineError::ConfigError(_) => {
                return_values::PARAMETER_EXCEPTION
            }
            EngineError::Deadlock(_) => return_values::DEADLOCK_DETECTED,
            EngineError::Internal(_) => return_values::OH_THE_HUMANITY_EXCEPTION,
            _ => return_values::OTHER_EXCEPTION,
        }
    }
}

impl From<config::ConfigError> for EngineError {
    fn from(e: config::ConfigError) -> Self {
        EngineError::ConfigError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_mapping() {
        assert_eq!(EngineError::Parameter("x".into()).exit_code(), 1);
        assert_eq!(EngineError::ConfigError("x".into()).exit_code(), 1);
        assert_eq!(EngineError::Deadlock("x".into()).exit_code(), 101);
        assert_eq!(EngineError::abort("x").exit_code(), 255);
        assert_eq!(EngineError::EventBusShutdown.exit_code(), 255);
        assert_eq!(EngineError::Internal("x".into()).exit_code(), 66);
    }

    #[test]
    fn test_abort_helpers() {
        let err = EngineError::abort("executable not found");
        assert!(err.is_abort());
        assert!(err.to_string().contains("executable not found"));
        assert!(!EngineError::EventBusShutdown.is_abort());
    }
}
