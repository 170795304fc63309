// src/backends/preloaded.rs
//! Backend replaying a fixed queue of responses
//!
//! Responses are written `[SAT=1.5],[TIMEOUT=10]`: outcome and runtime, one
//! bracketed pair per run, consumed in order.

use crate::evaluator::{RunExecutor, SharedObserver};
use crate::model::{AlgorithmRun, ExecutionConfig, RunConfig, RunResult};
use crate::utils::errors::{EngineError, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreloadedOptions {
    pub responses: String,
    pub quality: f64,
    pub run_length: f64,
    pub additional_run_data: String,
}

impl Default for PreloadedOptions {
    fn default() -> Self {
        Self {
            responses: String::new(),
            quality: 0.0,
            run_length: 0.0,
            additional_run_data: String::new(),
        }
    }
}

/// Parse `[RESULT=runtime],...` into a response queue
pub fn parse_responses(text: &str) -> Result<VecDeque<(RunResult, f64)>> {
    let invalid = |response: &str| {
        EngineError::Parameter(format!("Invalid Preloaded Response: {}", response))
    };

    let mut queue = VecDeque::new();
    for response in text.split(',').map(str::trim).filter(|r| !r.is_empty()) {
        let inner = response
            .strip_prefix('[')
            .and_then(|r| r.strip_suffix(']'))
            .ok_or_else(|| invalid(response))?;

        let (result, runtime) = inner.split_once('=').ok_or_else(|| invalid(response))?;
        if runtime.contains('=') {
            return Err(invalid(response));
        }

        let result: RunResult = result.trim().parse()?;
        let runtime: f64 = runtime.trim().parse().map_err(|_| invalid(response))?;
        queue.push_back((result, runtime));
    }
    Ok(queue)
}

pub struct PreloadedBackend {
    exec: Arc<ExecutionConfig>,
    options: PreloadedOptions,
    queue: Mutex<VecDeque<(RunResult, f64)>>,
}

impl PreloadedBackend {
    pub fn new(exec: Arc<ExecutionConfig>, options: PreloadedOptions) -> Result<Self> {
        let queue = parse_responses(&options.responses)?;
        Ok(Self {
            exec,
            options,
            queue: Mutex::new(queue),
        })
    }

    /// Responses not yet handed out
    pub fn remaining(&self) -> usize {
        self.queue.lock().len()
    }
}

impl RunExecutor for PreloadedBackend {
    fn name(&self) -> &'static str {
        "Preloaded"
    }

    fn execute(
        &self,
        runs: &[RunConfig],
        _observer: Option<&SharedObserver>,
    ) -> Result<Vec<AlgorithmRun>> {
        let mut queue = self.queue.lock();
        let mut completed = Vec::with_capacity(runs.len());

        for rc in runs {
            let (result, runtime) = match queue.pop_front() {
                Some(response) => response,
                None => {
                    return Err(EngineError::Abort {
                        message: "Preloaded backend is out of responses".to_string(),
                        runs: completed,
                    })
                }
            };

            completed.push(
                AlgorithmRun::new(
                    Arc::clone(&self.exec),
                    rc.clone(),
                    result,
                    runtime,
                    self.options.run_length,
                    self.options.quality,
                    rc.seed(),
                    0.0,
                )?
                .with_additional_run_data(self.options.additional_run_data.clone()),
            );
        }
        Ok(completed)
    }

    fn is_run_final(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::algorithm_run::test_support::*;

    fn backend(responses: &str) -> PreloadedBackend {
        PreloadedBackend::new(
            exec_config(),
            PreloadedOptions {
                responses: responses.to_string(),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_responses_in_order() {
        let backend = backend("[SAT=1.5], [TIMEOUT=10],[UNSAT=0.2]");
        let runs = backend
            .execute(&[run_config(1, 1, 10.0), run_config(1, 2, 10.0)], None)
            .unwrap();

        assert_eq!(runs[0].run_result(), RunResult::Sat);
        assert_eq!(runs[0].runtime(), 1.5);
        assert_eq!(runs[1].run_result(), RunResult::Timeout);
        assert_eq!(backend.remaining(), 1);
    }

    #[test]
    fn test_exhausted_queue_aborts() {
        let backend = backend("[SAT=1]");
        let result = backend.execute(&[run_config(1, 1, 10.0), run_config(1, 2, 10.0)], None);

        match result {
            Err(EngineError::Abort { runs, .. }) => assert_eq!(runs.len(), 1),
            other => panic!("expected abort, got {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn test_malformed_responses_rejected() {
        assert!(parse_responses("SAT=1").is_err());
        assert!(parse_responses("[SAT]").is_err());
        assert!(parse_responses("[SAT=1=2]").is_err());
        assert!(parse_responses("[WHAT=1]").is_err());
        assert!(parse_responses("[SAT=fast]").is_err());
        assert!(parse_responses("").unwrap().is_empty());
    }
}
