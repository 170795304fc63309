// src/backends/constant.rs
//! Backend that reports the same outcome for every run

use crate::evaluator::{RunExecutor, SharedObserver};
use crate::model::{AlgorithmRun, ExecutionConfig, RunConfig, RunResult};
use crate::utils::errors::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstantOptions {
    pub run_result: RunResult,
    pub runtime: f64,
    pub run_length: f64,
    pub quality: f64,
    pub additional_run_data: String,
}

impl Default for ConstantOptions {
    fn default() -> Self {
        Self {
            run_result: RunResult::Sat,
            runtime: 1.0,
            run_length: 0.0,
            quality: 0.0,
            additional_run_data: String::new(),
        }
    }
}

pub struct ConstantBackend {
    exec: Arc<ExecutionConfig>,
    options: ConstantOptions,
}

impl ConstantBackend {
    pub fn new(exec: Arc<ExecutionConfig>, options: ConstantOptions) -> Self {
        Self { exec, options }
    }
}

impl RunExecutor for ConstantBackend {
    fn name(&self) -> &'static str {
        "Constant"
    }

    fn execute(
        &self,
        runs: &[RunConfig],
        _observer: Option<&SharedObserver>,
    ) -> Result<Vec<AlgorithmRun>> {
        runs.iter()
            .map(|rc| {
                AlgorithmRun::new(
                    Arc::clone(&self.exec),
                    rc.clone(),
                    self.options.run_result,
                    self.options.runtime,
                    self.options.run_length,
                    self.options.quality,
                    rc.seed(),
                    0.0,
                )
                .map(|run| run.with_additional_run_data(self.options.additional_run_data.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::algorithm_run::test_support::*;
    use crate::utils::errors::EngineError;

    #[test]
    fn test_defaults() {
        let backend = ConstantBackend::new(exec_config(), ConstantOptions::default());
        let runs = backend
            .execute(&[run_config(1, 5, 10.0), run_config(2, 6, 10.0)], None)
            .unwrap();

        assert!(runs.iter().all(|r| r.run_result() == RunResult::Sat));
        assert!(runs.iter().all(|r| r.runtime() == 1.0 && r.run_length() == 0.0));
        assert_eq!(runs[1].result_seed(), 6);
    }

    #[test]
    fn test_invalid_constant_rejected() {
        let backend = ConstantBackend::new(
            exec_config(),
            ConstantOptions {
                runtime: -1.0,
                ..Default::default()
            },
        );
        let result = backend.execute(&[run_config(1, 1, 10.0)], None);
        assert!(matches!(result, Err(EngineError::InvalidRun(_))));
    }
}
