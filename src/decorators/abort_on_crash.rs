// src/decorators/abort_on_crash.rs
//! Crash policies
//!
//! - **AbortOnCrash**: any CRASHED outcome fails the whole batch with Abort
//! - **AbortOnFirstRunCrash**: only the first completed run of the evaluator's
//!   lifetime is checked, catching a misconfigured target early

use crate::decorators::map_callback;
use crate::evaluator::{Evaluator, EvaluatorCallback, SharedObserver};
use crate::model::{AlgorithmRun, RunConfig, RunResult};
use crate::utils::errors::{EngineError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::error;

fn abort_on_any_crash(runs: Vec<AlgorithmRun>) -> Result<Vec<AlgorithmRun>> {
    match runs.iter().find(|r| r.run_result() == RunResult::Crashed) {
        Some(crashed) => {
            let message = format!("Target Algorithm Run Reported Crashed: {}", crashed);
            error!("{}", message);
            Err(EngineError::Abort { message, runs })
        }
        None => Ok(runs),
    }
}

pub struct AbortOnCrashEvaluator {
    inner: Arc<dyn Evaluator>,
}

impl AbortOnCrashEvaluator {
    pub fn new(inner: Arc<dyn Evaluator>) -> Self {
        Self { inner }
    }
}

impl Evaluator for AbortOnCrashEvaluator {
    fn evaluate_runs(
        &self,
        runs: &[RunConfig],
        observer: Option<SharedObserver>,
    ) -> Result<Vec<AlgorithmRun>> {
        abort_on_any_crash(self.inner.evaluate_runs(runs, observer)?)
    }

    fn evaluate_runs_async(
        &self,
        runs: Vec<RunConfig>,
        callback: EvaluatorCallback,
        observer: Option<SharedObserver>,
    ) {
        self.inner
            .evaluate_runs_async(runs, map_callback(callback, abort_on_any_crash), observer);
    }

    delegate_evaluator!(inner =>
        is_run_final,
        are_runs_persisted,
        are_runs_observable,
        notify_shutdown,
        run_count,
        outstanding_run_count,
        outstanding_batch_count,
        wait_for_outstanding_evaluations,
        seek,
    );
}

pub struct AbortOnFirstRunCrashEvaluator {
    inner: Arc<dyn Evaluator>,
    first_run_checked: Arc<AtomicBool>,
}

impl AbortOnFirstRunCrashEvaluator {
    pub fn new(inner: Arc<dyn Evaluator>) -> Self {
        Self {
            inner,
            first_run_checked: Arc::new(AtomicBool::new(false)),
        }
    }
}

fn abort_on_first_crash(checked: &AtomicBool, runs: Vec<AlgorithmRun>) -> Result<Vec<AlgorithmRun>> {
    let first = match runs.first() {
        Some(first) => first,
        None => return Ok(runs),
    };

    if checked.swap(true, Ordering::AcqRel) || first.run_result() != RunResult::Crashed {
        return Ok(runs);
    }

    let message = format!("First Run Crashed: {}", first);
    error!("{}", message);
    Err(EngineError::Abort { message, runs })
}

impl Evaluator for AbortOnFirstRunCrashEvaluator {
    fn evaluate_runs(
        &self,
        runs: &[RunConfig],
        observer: Option<SharedObserver>,
    ) -> Result<Vec<AlgorithmRun>> {
        abort_on_first_crash(&self.first_run_checked, self.inner.evaluate_runs(runs, observer)?)
    }

    fn evaluate_runs_async(
        &self,
        runs: Vec<RunConfig>,
        callback: EvaluatorCallback,
        observer: Option<SharedObserver>,
    ) {
        let checked = Arc::clone(&self.first_run_checked);
        self.inner.evaluate_runs_async(
            runs,
            map_callback(callback, move |completed| abort_on_first_crash(&checked, completed)),
            observer,
        );
    }

    delegate_evaluator!(inner =>
        is_run_final,
        are_runs_persisted,
        are_runs_observable,
        notify_shutdown,
        run_count,
        outstanding_run_count,
        outstanding_batch_count,
        wait_for_outstanding_evaluations,
        seek,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decorators::test_support::*;
    use crate::model::algorithm_run::test_support::*;

    #[test]
    fn test_crash_aborts_with_outcomes() {
        let (_backend, inner) = scripted(RunResult::Crashed, 1.0);
        let evaluator = AbortOnCrashEvaluator::new(inner);

        match evaluator.evaluate(&[run_config(1, 1, 5.0), run_config(1, 2, 5.0)]) {
            Err(EngineError::Abort { runs, .. }) => assert_eq!(runs.len(), 2),
            other => panic!("expected abort, got {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn test_success_passes() {
        let (_backend, inner) = scripted(RunResult::Sat, 1.0);
        let evaluator = AbortOnCrashEvaluator::new(inner);
        assert_eq!(evaluator.evaluate(&[run_config(1, 1, 5.0)]).unwrap().len(), 1);
    }

    #[test]
    fn test_async_crash_reported_as_failure() {
        let (_backend, inner) = scripted(RunResult::Crashed, 1.0);
        let evaluator = AbortOnCrashEvaluator::new(inner);
        let (tx, rx) = crossbeam_channel::bounded(1);

        evaluator.evaluate_runs_async(
            vec![run_config(1, 1, 5.0)],
            Box::new(move |result| tx.send(result.map_err(|e| e.is_abort())).unwrap()),
            None,
        );
        assert!(matches!(rx.recv().unwrap(), Err(true)));
    }

    #[test]
    fn test_only_first_run_checked() {
        let checked = AtomicBool::new(false);
        let rc = run_config(1, 1, 5.0);

        let first_ok = vec![run(&rc, RunResult::Sat, 1.0)];
        assert!(abort_on_first_crash(&checked, first_ok).is_ok());

        let later_crash = vec![run(&rc, RunResult::Crashed, 1.0)];
        assert!(abort_on_first_crash(&checked, later_crash).is_ok());
    }

    #[test]
    fn test_first_run_crash_aborts() {
        let (_backend, inner) = scripted(RunResult::Crashed, 1.0);
        let evaluator = AbortOnFirstRunCrashEvaluator::new(inner);

        assert!(evaluator.evaluate(&[run_config(1, 1, 5.0)]).unwrap_err().is_abort());
        assert!(evaluator.evaluate(&[run_config(1, 2, 5.0)]).is_ok());
    }

    #[test]
    fn test_empty_batch_does_not_consume_check() {
        let checked = AtomicBool::new(false);
        assert!(abort_on_first_crash(&checked, Vec::new()).unwrap().is_empty());
        assert!(!checked.load(Ordering::SeqCst));
    }
}
