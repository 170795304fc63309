// src/model/execution_config.rs
//! How the target algorithm is invoked

use crate::utils::errors::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Execution settings shared by every run of one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    algorithm_executable: String,
    algorithm_execution_directory: PathBuf,
    deterministic: bool,
    algorithm_cutoff_time: f64,
}

impl ExecutionConfig {
    pub fn new(
        algorithm_executable: impl Into<String>,
        algorithm_execution_directory: impl Into<PathBuf>,
        deterministic: bool,
        algorithm_cutoff_time: f64,
    ) -> Result<Self> {
        if algorithm_cutoff_time.is_nan() || algorithm_cutoff_time < 0.0 {
            return Err(EngineError::Parameter(format!(
                "Algorithm cutoff time must be non-negative: {}",
                algorithm_cutoff_time
            )));
        }

        if algorithm_cutoff_time == 0.0 {
            warn!("Algorithm cutoff time is 0 seconds, every run will time out immediately");
        }

        Ok(Self {
            algorithm_executable: algorithm_executable.into(),
            algorithm_execution_directory: algorithm_execution_directory.into(),
            deterministic,
            algorithm_cutoff_time,
        })
    }

    pub fn algorithm_executable(&self) -> &str {
        &self.algorithm_executable
    }

    pub fn algorithm_execution_directory(&self) -> &Path {
        &self.algorithm_execution_directory
    }

    pub fn is_deterministic(&self) -> bool {
        self.deterministic
    }

    pub fn algorithm_cutoff_time(&self) -> f64 {
        self.algorithm_cutoff_time
    }
}

impl fmt::Display for ExecutionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Exec:{}, Dir:{}, Deterministic:{}, Cutoff:{}]",
            self.algorithm_executable,
            self.algorithm_execution_directory.display(),
            self.deterministic,
            self.algorithm_cutoff_time
        )
    }
}
