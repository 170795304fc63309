// src/model/algorithm_run.rs
//! Validated run outcomes

use crate::model::{ExecutionConfig, RunConfig, RunResult};
use crate::utils::errors::{EngineError, Result};
use std::fmt;
use std::sync::Arc;

/// The measured result of executing one [`RunConfig`]
#[derive(Debug, Clone)]
pub struct AlgorithmRun {
    execution_config: Arc<ExecutionConfig>,
    run_config: RunConfig,
    result: RunResult,
    runtime: f64,
    run_length: f64,
    quality: f64,
    result_seed: i64,
    additional_run_data: String,
    wallclock_time: f64,
}

impl AlgorithmRun {
    /// Create a completed run. `RUNNING` is rejected, only killable
    /// snapshots may carry it.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        execution_config: Arc<ExecutionConfig>,
        run_config: RunConfig,
        result: RunResult,
        runtime: f64,
        run_length: f64,
        quality: f64,
        result_seed: i64,
        wallclock_time: f64,
    ) -> Result<Self> {
        Self::build(
            execution_config,
            run_config,
            result,
            runtime,
            run_length,
            quality,
            result_seed,
            wallclock_time,
            false,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn build(
        execution_config: Arc<ExecutionConfig>,
        run_config: RunConfig,
        result: RunResult,
        runtime: f64,
        run_length: f64,
        quality: f64,
        result_seed: i64,
        wallclock_time: f64,
        killable: bool,
    ) -> Result<Self> {
        if runtime.is_nan() || runtime < 0.0 {
            return Err(EngineError::InvalidRun(format!(
                "Runtime must be non-negative: {} for {}",
                runtime, run_config
            )));
        }

        if run_length.is_nan() || (run_length < 0.0 && run_length != -1.0) {
            return Err(EngineError::InvalidRun(format!(
                "Run length must be non-negative or -1: {} for {}",
                run_length, run_config
            )));
        }

        if quality.is_nan() {
            return Err(EngineError::InvalidRun(format!(
                "Quality must not be NaN for {}",
                run_config
            )));
        }

        if result == RunResult::Running && !killable {
            return Err(EngineError::InvalidRun(format!(
                "Only killable runs may be RUNNING: {}",
                run_config
            )));
        }

        Ok(Self {
            execution_config,
            run_config,
            result,
            runtime,
            run_length,
            quality,
            result_seed,
            additional_run_data: String::new(),
            wallclock_time: if wallclock_time.is_finite() && wallclock_time >= 0.0 {
                wallclock_time
            } else {
                0.0
            },
        })
    }

    /// Attach free-form data. Newlines are flattened so the result line
    /// stays one line.
    pub fn with_additional_run_data(mut self, data: impl Into<String>) -> Self {
        self.additional_run_data = data.into().replace(['\n', '\r'], " ").trim().to_string();
        self
    }

    /// Copy with a different outcome kind and runtime
    pub fn with_result(&self, result: RunResult, runtime: f64) -> Result<Self> {
        self.rebuild(result, runtime, false)
    }

    pub(crate) fn rebuild(&self, result: RunResult, runtime: f64, killable: bool) -> Result<Self> {
        let mut run = Self::build(
            self.execution_config.clone(),
            self.run_config.clone(),
            result,
            runtime,
            self.run_length,
            self.quality,
            self.result_seed,
            self.wallclock_time,
            killable,
        )?;
        run.additional_run_data = self.additional_run_data.clone();
        Ok(run)
    }

    /// Copy with a different runtime
    pub fn with_runtime(&self, runtime: f64) -> Result<Self> {
        self.with_result(self.result, runtime)
    }

    pub fn execution_config(&self) -> &Arc<ExecutionConfig> {
        &self.execution_config
    }

    pub fn run_config(&self) -> &RunConfig {
        &self.run_config
    }

    pub fn run_result(&self) -> RunResult {
        self.result
    }

    pub fn runtime(&self) -> f64 {
        self.runtime
    }

    pub fn run_length(&self) -> f64 {
        self.run_length
    }

    pub fn quality(&self) -> f64 {
        self.quality
    }

    pub fn result_seed(&self) -> i64 {
        self.result_seed
    }

    pub fn additional_run_data(&self) -> &str {
        &self.additional_run_data
    }

    pub fn wallclock_execution_time(&self) -> f64 {
        self.wallclock_time
    }

    pub fn is_run_completed(&self) -> bool {
        self.result != RunResult::Running
    }

    /// `RESULT, runtime, runlength, quality, seed[, additional]`
    pub fn result_line(&self) -> String {
        let mut line = format!(
            "{}, {}, {}, {}, {}",
            self.result, self.runtime, self.run_length, self.quality, self.result_seed
        );
        if !self.additional_run_data.is_empty() {
            line.push_str(", ");
            line.push_str(&self.additional_run_data);
        }
        line
    }
}

impl fmt::Display for AlgorithmRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ==> <{}> W:({:.3})",
            self.run_config,
            self.result_line(),
            self.wallclock_time
        )
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::model::{ParamConfiguration, ProblemInstance, ProblemInstanceSeedPair};

    pub fn exec_config() -> Arc<ExecutionConfig> {
        Arc::new(ExecutionConfig::new("./solver", ".", false, 300.0).unwrap())
    }

    pub fn run_config(instance: u32, seed: i64, cutoff: f64) -> RunConfig {
        RunConfig::new(
            ProblemInstanceSeedPair::new(
                ProblemInstance::new(instance, format!("instance-{}.cnf", instance)),
                seed,
            ),
            cutoff,
            ParamConfiguration::from_pairs([("alpha", "1")]),
        )
        .unwrap()
    }

    pub fn run(rc: &RunConfig, result: RunResult, runtime: f64) -> AlgorithmRun {
        AlgorithmRun::new(exec_config(), rc.clone(), result, runtime, 0.0, 0.0, rc.seed(), runtime)
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_validation() {
        let rc = run_config(1, 1, 10.0);
        let exec = exec_config();

        assert!(AlgorithmRun::new(exec.clone(), rc.clone(), RunResult::Sat, f64::NAN, 0.0, 0.0, 1, 0.0).is_err());
        assert!(AlgorithmRun::new(exec.clone(), rc.clone(), RunResult::Sat, -1.0, 0.0, 0.0, 1, 0.0).is_err());
        assert!(AlgorithmRun::new(exec.clone(), rc.clone(), RunResult::Sat, 1.0, -2.0, 0.0, 1, 0.0).is_err());
        assert!(AlgorithmRun::new(exec.clone(), rc.clone(), RunResult::Sat, 1.0, -1.0, 0.0, 1, 0.0).is_ok());
        assert!(AlgorithmRun::new(exec.clone(), rc.clone(), RunResult::Sat, 1.0, 0.0, f64::NAN, 1, 0.0).is_err());
        assert!(AlgorithmRun::new(exec, rc, RunResult::Running, 1.0, 0.0, 0.0, 1, 0.0).is_err());
    }

    #[test]
    fn test_result_line() {
        let rc = run_config(1, 42, 10.0);
        let run = AlgorithmRun::new(exec_config(), rc, RunResult::Sat, 1.5, -1.0, 0.0, 42, 1.6)
            .unwrap()
            .with_additional_run_data("solved\nquickly");

        assert_eq!(run.result_line(), "SAT, 1.5, -1, 0, 42, solved quickly");
    }

    #[test]
    fn test_with_result_keeps_measurements() {
        let rc = run_config(1, 1, 10.0);
        let run = run(&rc, RunResult::Sat, 12.0);
        let corrected = run.with_result(RunResult::Timeout, 10.0).unwrap();

        assert_eq!(corrected.run_result(), RunResult::Timeout);
        assert_eq!(corrected.runtime(), 10.0);
        assert_eq!(corrected.wallclock_execution_time(), 12.0);
    }
}
