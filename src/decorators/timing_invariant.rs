// src/decorators/timing_invariant.rs
//! Timing invariant correction
//!
//! A run that used its whole cutoff timed out, whatever the backend says.

use crate::decorators::map_callback;
use crate::evaluator::{Evaluator, EvaluatorCallback, SharedObserver};
use crate::model::{AlgorithmRun, RunConfig, RunResult};
use crate::utils::errors::Result;
use std::sync::Arc;
use tracing::debug;

pub struct TimingInvariantEvaluator {
    inner: Arc<dyn Evaluator>,
}

impl TimingInvariantEvaluator {
    pub fn new(inner: Arc<dyn Evaluator>) -> Self {
        Self { inner }
    }
}

/// `runtime >= cutoff` becomes TIMEOUT with runtime = cutoff
pub(crate) fn enforce_timing_invariant(run: AlgorithmRun) -> Result<AlgorithmRun> {
    let cutoff = run.run_config().cutoff_time();
    if run.runtime() < cutoff {
        return Ok(run);
    }

    if run.run_result() != RunResult::Timeout || run.runtime() != cutoff {
        debug!(
            "Rewriting {} ({} s) to TIMEOUT at cutoff {} s for {}",
            run.run_result(),
            run.runtime(),
            cutoff,
            run.run_config()
        );
    }
    run.with_result(RunResult::Timeout, cutoff)
}

fn enforce_all(runs: Vec<AlgorithmRun>) -> Result<Vec<AlgorithmRun>> {
    runs.into_iter().map(enforce_timing_invariant).collect()
}

impl Evaluator for TimingInvariantEvaluator {
    fn evaluate_runs(
        &self,
        runs: &[RunConfig],
        observer: Option<SharedObserver>,
    ) -> Result<Vec<AlgorithmRun>> {
        enforce_all(self.inner.evaluate_runs(runs, observer)?)
    }

    fn evaluate_runs_async(
        &self,
        runs: Vec<RunConfig>,
        callback: EvaluatorCallback,
        observer: Option<SharedObserver>,
    ) {
        self.inner
            .evaluate_runs_async(runs, map_callback(callback, enforce_all), observer);
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
    use proptest::prelude::*;

    #[test]
    fn test_overtime_sat_becomes_timeout() {
        let (_backend, inner) = scripted(RunResult::Sat, 12.0);
        let evaluator = TimingInvariantEvaluator::new(inner);

        let runs = evaluator.evaluate(&[run_config(1, 1, 10.0)]).unwrap();
        assert_eq!(runs[0].run_result(), RunResult::Timeout);
        assert_eq!(runs[0].runtime(), 10.0);
    }

    #[test]
    fn test_under_cutoff_untouched() {
        let (_backend, inner) = scripted(RunResult::Unsat, 3.0);
        let evaluator = TimingInvariantEvaluator::new(inner);

        let runs = evaluator.evaluate(&[run_config(1, 1, 10.0)]).unwrap();
        assert_eq!(runs[0].run_result(), RunResult::Unsat);
        assert_eq!(runs[0].runtime(), 3.0);
    }

    #[test]
    fn test_async_outcomes_corrected() {
        let (_backend, inner) = scripted(RunResult::Sat, 7.0);
        let evaluator = TimingInvariantEvaluator::new(inner);
        let (tx, rx) = crossbeam_channel::bounded(1);

        evaluator.evaluate_runs_async(
            vec![run_config(1, 1, 5.0)],
            Box::new(move |result| tx.send(result).unwrap()),
            None,
        );

        let runs = rx.recv().unwrap().unwrap();
        assert_eq!(runs[0].run_result(), RunResult::Timeout);
        assert_eq!(runs[0].runtime(), 5.0);
    }

    fn result_strategy() -> impl Strategy<Value = RunResult> {
        prop_oneof![
            Just(RunResult::Sat),
            Just(RunResult::Unsat),
            Just(RunResult::Timeout),
            Just(RunResult::Crashed),
        ]
    }

    proptest! {
        #[test]
        fn proptest_runtime_never_exceeds_cutoff(
            result in result_strategy(),
            cutoff in 0.0f64..1000.0,
            runtime in 0.0f64..2000.0,
        ) {
            let rc = run_config(1, 1, cutoff);
            let corrected = enforce_timing_invariant(run(&rc, result, runtime)).unwrap();

            prop_assert!(corrected.runtime() <= cutoff || corrected.runtime() == runtime);
            if runtime >= cutoff {
                prop_assert_eq!(corrected.run_result(), RunResult::Timeout);
                prop_assert_eq!(corrected.runtime(), cutoff);
            } else {
                prop_assert_eq!(corrected.run_result(), result);
                prop_assert_eq!(corrected.runtime(), runtime);
            }
        }
    }
}
