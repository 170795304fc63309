// src/decorators/outstanding.rs
//! Outstanding evaluation tracking
//!
//! A batch counts as outstanding from submission until the caller's
//! callback has returned, so `wait_for_outstanding_evaluations` also waits
//! for result handling. Decorators that hold work back (bounding, queueing)
//! must sit inside this one or their queued batches are invisible here.

use crate::evaluator::{Evaluator, EvaluatorCallback, OutstandingTracker, SharedObserver};
use crate::model::{AlgorithmRun, RunConfig};
use crate::utils::errors::Result;
use std::sync::Arc;
use tracing::trace;

pub struct OutstandingEvaluationsEvaluator {
    inner: Arc<dyn Evaluator>,
    tracker: OutstandingTracker,
}

impl OutstandingEvaluationsEvaluator {
    pub fn new(inner: Arc<dyn Evaluator>) -> Self {
        Self {
            inner,
            tracker: OutstandingTracker::new(),
        }
    }
}

impl Evaluator for OutstandingEvaluationsEvaluator {
    fn evaluate_runs(
        &self,
        runs: &[RunConfig],
        observer: Option<SharedObserver>,
    ) -> Result<Vec<AlgorithmRun>> {
        let _outstanding = self.tracker.begin(runs.len());
        trace!("Outstanding batches now {}", self.tracker.outstanding_batches());
        self.inner.evaluate_runs(runs, observer)
    }

    fn evaluate_runs_async(
        &self,
        runs: Vec<RunConfig>,
        callback: EvaluatorCallback,
        observer: Option<SharedObserver>,
    ) {
        let outstanding = self.tracker.begin(runs.len());
        trace!("Outstanding batches now {}", self.tracker.outstanding_batches());

        self.inner.evaluate_runs_async(
            runs,
            Box::new(move |result| {
                callback(result);
                drop(outstanding);
            }),
            observer,
        );
    }

    fn outstanding_run_count(&self) -> usize {
        self.tracker.outstanding_runs()
    }

    fn outstanding_batch_count(&self) -> usize {
        self.tracker.outstanding_batches()
    }

    fn wait_for_outstanding_evaluations(&self) {
        self.tracker.wait_until_idle();
    }

    delegate_evaluator!(inner =>
        is_run_final,
        are_runs_persisted,
        are_runs_observable,
        notify_shutdown,
        run_count,
        seek,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decorators::test_support::*;
    use crate::evaluator::SyncEvaluatorAdapter;
    use crate::model::algorithm_run::test_support::run_config;
    use crate::model::RunResult;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_wait_covers_callback() {
        let backend = Arc::new(ScriptedBackend::new(RunResult::Sat, 1.0).with_delay(Duration::from_millis(20)));
        let inner = Arc::new(SyncEvaluatorAdapter::new(backend));
        let evaluator = OutstandingEvaluationsEvaluator::new(inner);

        let handled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&handled);
        evaluator.evaluate_runs_async(
            vec![run_config(1, 1, 5.0), run_config(1, 2, 5.0)],
            Box::new(move |_| {
                thread::sleep(Duration::from_millis(30));
                flag.store(true, Ordering::SeqCst);
            }),
            None,
        );

        assert_eq!(evaluator.outstanding_batch_count(), 1);
        assert_eq!(evaluator.outstanding_run_count(), 2);

        evaluator.wait_for_outstanding_evaluations();
        assert!(handled.load(Ordering::SeqCst));
        assert_eq!(evaluator.outstanding_run_count(), 0);
    }

    #[test]
    fn test_failed_batch_released() {
        let (_backend, inner) = scripted(RunResult::Sat, 1.0);
        inner.notify_shutdown();
        let evaluator = OutstandingEvaluationsEvaluator::new(inner);

        evaluator.evaluate_runs_async(vec![run_config(1, 1, 5.0)], Box::new(|_| {}), None);
        evaluator.wait_for_outstanding_evaluations();
        assert_eq!(evaluator.outstanding_batch_count(), 0);
    }
}
