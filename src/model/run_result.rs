// src/model/run_result.rs
//! Outcome kinds of a single run

use crate::utils::errors::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome kind reported for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunResult {
    Timeout,
    Sat,
    Unsat,
    Crashed,
    Abort,
    Killed,
    Running,
}

impl RunResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunResult::Timeout => "TIMEOUT",
            RunResult::Sat => "SAT",
            RunResult::Unsat => "UNSAT",
            RunResult::Crashed => "CRASHED",
            RunResult::Abort => "ABORT",
            RunResult::Killed => "KILLED",
            RunResult::Running => "RUNNING",
        }
    }

    /// Whether a target algorithm may report this outcome about itself
    pub fn is_permitted_by_wrappers(&self) -> bool {
        matches!(self, RunResult::Sat | RunResult::Unsat | RunResult::Timeout)
    }

    /// SAT or UNSAT
    pub fn is_decided(&self) -> bool {
        matches!(self, RunResult::Sat | RunResult::Unsat)
    }

    pub fn is_successful_and_correct(&self) -> bool {
        self.is_decided()
    }
}

impl FromStr for RunResult {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SAT" | "SATISFIABLE" => Ok(RunResult::Sat),
            "UNSAT" | "UNSATISFIABLE" => Ok(RunResult::Unsat),
            "TIMEOUT" => Ok(RunResult::Timeout),
            "CRASHED" => Ok(RunResult::Crashed),
            "ABORT" => Ok(RunResult::Abort),
            "KILLED" => Ok(RunResult::Killed),
            "RUNNING" => Ok(RunResult::Running),
            other => Err(EngineError::InvalidRun(format!(
                "Unknown run result: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
