// src/termination/criteria.rs
//! Scenario termination options

use crate::termination::no_runs::DEFAULT_CHALLENGE_LIMIT;
use crate::termination::{
    CompositeTerminationCondition, CpuTimeCondition, FileDeletedCondition,
    ModelIterationCondition, NoRunsForManyChallengesCondition, RunLimitCondition,
    TerminationCondition, WallClockCondition,
};
use crate::utils::errors::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Limits controlling how long a configuration session runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminationCriteria {
    /// Total CPU seconds for target algorithm runs (and our own time)
    pub tuner_time_limit: f64,

    /// Count this process's CPU time against the tuner time limit
    pub count_own_cpu_time: bool,

    /// Wall-clock seconds
    pub wallclock_limit: f64,

    pub total_run_limit: u64,

    pub model_iteration_limit: u64,

    /// Challenges without a new run before the search is considered stalled
    pub challenge_iteration_limit: u64,

    /// Terminate when this file is deleted
    pub termination_file: Option<PathBuf>,
}

impl Default for TerminationCriteria {
    fn default() -> Self {
        Self {
            tuner_time_limit: f64::MAX,
            count_own_cpu_time: true,
            wallclock_limit: f64::MAX,
            total_run_limit: u64::MAX,
            model_iteration_limit: u64::MAX,
            challenge_iteration_limit: DEFAULT_CHALLENGE_LIMIT,
            termination_file: None,
        }
    }
}

impl TerminationCriteria {
    pub fn validate(&self) -> Result<()> {
        if self.tuner_time_limit.is_nan() || self.tuner_time_limit < 0.0 {
            return Err(EngineError::ConfigError(format!(
                "tuner_time_limit must be non-negative: {}",
                self.tuner_time_limit
            )));
        }
        if self.wallclock_limit.is_nan() || self.wallclock_limit <= 0.0 {
            return Err(EngineError::ConfigError(format!(
                "wallclock_limit must be positive: {}",
                self.wallclock_limit
            )));
        }
        if self.total_run_limit == 0 {
            return Err(EngineError::ConfigError(
                "total_run_limit must be positive".to_string(),
            ));
        }
        if self.model_iteration_limit == 0 {
            return Err(EngineError::ConfigError(
                "model_iteration_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the composite over every configured condition. The wall-clock
    /// budget starts now.
    pub fn build(&self) -> Result<CompositeTerminationCondition> {
        self.validate()?;

        let mut conditions: Vec<Arc<dyn TerminationCondition>> = vec![
            Arc::new(CpuTimeCondition::new(
                self.tuner_time_limit,
                self.count_own_cpu_time,
            )),
            Arc::new(WallClockCondition::new(self.wallclock_limit)),
            Arc::new(RunLimitCondition::new(self.total_run_limit)),
            Arc::new(ModelIterationCondition::new(self.model_iteration_limit)),
            Arc::new(NoRunsForManyChallengesCondition::new(
                self.challenge_iteration_limit,
            )),
        ];

        if let Some(path) = &self.termination_file {
            conditions.push(Arc::new(FileDeletedCondition::new(path)?));
        }

        Ok(CompositeTerminationCondition::new(conditions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_never_stop() {
        let criteria = TerminationCriteria {
            count_own_cpu_time: false,
            ..Default::default()
        };
        let composite = criteria.build().unwrap();
        assert!(!composite.must_stop());
        assert_eq!(composite.len(), 5);
    }

    #[test]
    fn test_termination_file_added() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let criteria = TerminationCriteria {
            termination_file: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        assert_eq!(criteria.build().unwrap().len(), 6);
    }

    #[test]
    fn test_invalid_limits_rejected() {
        let criteria = TerminationCriteria {
            total_run_limit: 0,
            ..Default::default()
        };
        assert!(criteria.build().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let criteria: TerminationCriteria =
            serde_yaml::from_str("tuner_time_limit: 10\ntotal_run_limit: 3\n").unwrap();
        assert_eq!(criteria.tuner_time_limit, 10.0);
        assert_eq!(criteria.total_run_limit, 3);
        assert!(criteria.count_own_cpu_time);
        assert_eq!(criteria.challenge_iteration_limit, 1000);
    }
}
