// src/backends/blackhole.rs
//! Evaluator that swallows async batches
//!
//! Used to test behaviour around runs that never complete. Callbacks are
//! held until shutdown and then dropped without being invoked.

use crate::evaluator::{Evaluator, EvaluatorCallback, SharedObserver};
use crate::model::{AlgorithmRun, RunConfig};
use crate::utils::errors::{EngineError, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlackHoleOptions {
    /// Warn at construction and for every dropped batch
    pub warnings: bool,
}

impl Default for BlackHoleOptions {
    fn default() -> Self {
        Self { warnings: true }
    }
}

struct Swallowed {
    callbacks: Vec<EvaluatorCallback>,
    runs: usize,
}

pub struct BlackHoleEvaluator {
    options: BlackHoleOptions,
    swallowed: Mutex<Swallowed>,
    seeked: AtomicU64,
}

impl BlackHoleEvaluator {
    pub fn new(options: BlackHoleOptions) -> Self {
        if options.warnings {
            warn!("Black hole evaluator drops every run, your application is probably just going to hang");
        }
        Self {
            options,
            swallowed: Mutex::new(Swallowed {
                callbacks: Vec::new(),
                runs: 0,
            }),
            seeked: AtomicU64::new(0),
        }
    }
}

impl Evaluator for BlackHoleEvaluator {
    fn evaluate_runs(
        &self,
        runs: &[RunConfig],
        _observer: Option<SharedObserver>,
    ) -> Result<Vec<AlgorithmRun>> {
        Err(EngineError::abort(format!(
            "Black hole evaluator cannot evaluate {} runs synchronously",
            runs.len()
        )))
    }

    fn evaluate_runs_async(
        &self,
        runs: Vec<RunConfig>,
        callback: EvaluatorCallback,
        _observer: Option<SharedObserver>,
    ) {
        if self.options.warnings {
            warn!("Black hole has silently dropped a set of {} runs", runs.len());
        }
        let mut swallowed = self.swallowed.lock();
        swallowed.runs += runs.len();
        swallowed.callbacks.push(callback);
    }

    fn is_run_final(&self) -> bool {
        false
    }

    fn are_runs_persisted(&self) -> bool {
        false
    }

    fn are_runs_observable(&self) -> bool {
        false
    }

    fn notify_shutdown(&self) {
        let mut swallowed = self.swallowed.lock();
        swallowed.callbacks.clear();
        swallowed.runs = 0;
    }

    fn run_count(&self) -> u64 {
        self.seeked.load(Ordering::Acquire)
    }

    fn outstanding_run_count(&self) -> usize {
        self.swallowed.lock().runs
    }

    fn outstanding_batch_count(&self) -> usize {
        self.swallowed.lock().callbacks.len()
    }

    /// Swallowed batches never finish, waiting on them would never return
    fn wait_for_outstanding_evaluations(&self) {
        if self.outstanding_batch_count() > 0 && self.options.warnings {
            warn!("Black hole evaluator has outstanding batches that will never complete, not waiting");
        }
    }

    fn seek(&self, runs: &[AlgorithmRun]) {
        self.seeked.fetch_add(runs.len() as u64, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::algorithm_run::test_support::run_config;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    #[test]
    fn test_async_never_completes() {
        let evaluator = BlackHoleEvaluator::new(BlackHoleOptions::default());
        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);

        evaluator.evaluate_runs_async(
            vec![run_config(1, 1, 5.0), run_config(1, 2, 5.0)],
            Box::new(move |_| flag.store(true, Ordering::SeqCst)),
            None,
        );

        evaluator.wait_for_outstanding_evaluations();
        assert_eq!(evaluator.outstanding_batch_count(), 1);
        assert_eq!(evaluator.outstanding_run_count(), 2);

        evaluator.notify_shutdown();
        assert!(!called.load(Ordering::SeqCst));
        assert_eq!(evaluator.outstanding_batch_count(), 0);
    }

    #[test]
    fn test_sync_aborts() {
        let evaluator = BlackHoleEvaluator::new(BlackHoleOptions { warnings: false });
        let result = evaluator.evaluate(&[run_config(1, 1, 5.0)]);
        assert!(matches!(result, Err(EngineError::Abort { .. })));
    }
}
