// src/evaluator/adapter.rs
//! Synchronous backend adapter
//!
//! Backends that can only block implement [`RunExecutor`]. The adapter
//! supplies the rest of the [`Evaluator`] contract: async submissions run on
//! a named worker thread, and run counts and outstanding work are tracked.

use crate::evaluator::{EvaluatorCallback, Evaluator, OutstandingTracker, SharedObserver};
use crate::model::{AlgorithmRun, RunConfig};
use crate::utils::errors::{EngineError, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error};

/// A backend that evaluates a batch by blocking the calling thread
pub trait RunExecutor: Send + Sync + 'static {
    /// Short name used for worker threads and log lines
    fn name(&self) -> &'static str;

    fn execute(
        &self,
        runs: &[RunConfig],
        observer: Option<&SharedObserver>,
    ) -> Result<Vec<AlgorithmRun>>;

    fn is_run_final(&self) -> bool {
        false
    }

    fn are_runs_persisted(&self) -> bool {
        false
    }

    fn are_runs_observable(&self) -> bool {
        false
    }

    fn shutdown(&self) {}
}

struct AdapterState<B: RunExecutor> {
    backend: B,
    run_count: AtomicU64,
    tracker: OutstandingTracker,
    shutdown: AtomicBool,
    worker_sequence: AtomicU64,
}

impl<B: RunExecutor> AdapterState<B> {
    fn check_open(&self) -> Result<()> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(EngineError::EvaluatorShutdown(format!(
                "{} has been shutdown",
                self.backend.name()
            )));
        }
        Ok(())
    }

    fn execute(
        &self,
        runs: &[RunConfig],
        observer: Option<&SharedObserver>,
    ) -> Result<Vec<AlgorithmRun>> {
        let completed = self.backend.execute(runs, observer)?;
        self.run_count
            .fetch_add(completed.len() as u64, Ordering::AcqRel);
        Ok(completed)
    }

    fn evaluate(
        &self,
        runs: &[RunConfig],
        observer: Option<&SharedObserver>,
    ) -> Result<Vec<AlgorithmRun>> {
        self.check_open()?;
        if runs.is_empty() {
            return Ok(Vec::new());
        }

        let _outstanding = self.tracker.begin(runs.len());
        self.execute(runs, observer)
    }
}

/// Full [`Evaluator`] over a blocking [`RunExecutor`]
pub struct SyncEvaluatorAdapter<B: RunExecutor> {
    state: Arc<AdapterState<B>>,
}

impl<B: RunExecutor> SyncEvaluatorAdapter<B> {
    pub fn new(backend: B) -> Self {
        Self {
            state: Arc::new(AdapterState {
                backend,
                run_count: AtomicU64::new(0),
                tracker: OutstandingTracker::new(),
                shutdown: AtomicBool::new(false),
                worker_sequence: AtomicU64::new(0),
            }),
        }
    }

    pub fn backend(&self) -> &B {
        &self.state.backend
    }
}

impl<B: RunExecutor> Evaluator for SyncEvaluatorAdapter<B> {
    fn evaluate_runs(
        &self,
        runs: &[RunConfig],
        observer: Option<SharedObserver>,
    ) -> Result<Vec<AlgorithmRun>> {
        self.state.evaluate(runs, observer.as_ref())
    }

    fn evaluate_runs_async(
        &self,
        runs: Vec<RunConfig>,
        callback: EvaluatorCallback,
        observer: Option<SharedObserver>,
    ) {
        if let Err(e) = self.state.check_open() {
            callback(Err(e));
            return;
        }
        if runs.is_empty() {
            callback(Ok(Vec::new()));
            return;
        }

        let state = Arc::clone(&self.state);
        let id = state.worker_sequence.fetch_add(1, Ordering::Relaxed);
        let name = format!("{} Async Worker {}", state.backend.name(), id);

        // Outstanding from submission, not from thread start
        let outstanding = state.tracker.begin(runs.len());

        // Shared slot so a failed spawn can still report through the callback
        let slot = Arc::new(parking_lot::Mutex::new(Some(callback)));
        let worker_slot = Arc::clone(&slot);

        let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
            let result = state.execute(&runs, observer.as_ref());
            drop(outstanding);
            if let Some(callback) = worker_slot.lock().take() {
                callback(result);
            }
        });

        match spawned {
            Ok(_) => debug!("Dispatched async batch to {}", name),
            Err(e) => {
                error!("Could not start {}: {}", name, e);
                if let Some(callback) = slot.lock().take() {
                    callback(Err(EngineError::Io(e)));
                }
            }
        }
    }

    fn is_run_final(&self) -> bool {
        self.state.backend.is_run_final()
    }

    fn are_runs_persisted(&self) -> bool {
        self.state.backend.are_runs_persisted()
    }

    fn are_runs_observable(&self) -> bool {
        self.state.backend.are_runs_observable()
    }

    fn notify_shutdown(&self) {
        if !self.state.shutdown.swap(true, Ordering::AcqRel) {
            debug!("Shutting down {}", self.state.backend.name());
            self.state.backend.shutdown();
        }
    }

    fn run_count(&self) -> u64 {
        self.state.run_count.load(Ordering::Acquire)
    }

    fn outstanding_run_count(&self) -> usize {
        self.state.tracker.outstanding_runs()
    }

    fn outstanding_batch_count(&self) -> usize {
        self.state.tracker.outstanding_batches()
    }

    fn wait_for_outstanding_evaluations(&self) {
        self.state.tracker.wait_until_idle();
    }

    fn seek(&self, runs: &[AlgorithmRun]) {
        self.state
            .run_count
            .fetch_add(runs.len() as u64, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::algorithm_run::test_support::*;
    use crate::model::RunResult;
    use crossbeam_channel::bounded;
    use std::time::Duration;

    struct EchoBackend;

    impl RunExecutor for EchoBackend {
        fn name(&self) -> &'static str {
            "Echo"
        }

        fn execute(
            &self,
            runs: &[RunConfig],
            _observer: Option<&SharedObserver>,
        ) -> Result<Vec<AlgorithmRun>> {
            Ok(runs.iter().map(|rc| run(rc, RunResult::Sat, 1.0)).collect())
        }
    }

    #[test]
    fn test_sync_evaluation_counts_runs() {
        let evaluator = SyncEvaluatorAdapter::new(EchoBackend);
        let runs = vec![run_config(1, 1, 5.0), run_config(1, 2, 5.0)];

        let completed = evaluator.evaluate(&runs).unwrap();
        assert_eq!(completed.len(), 2);
        assert_eq!(evaluator.run_count(), 2);
        assert_eq!(evaluator.outstanding_batch_count(), 0);
    }

    #[test]
    fn test_async_callback_fires_once() {
        let evaluator = SyncEvaluatorAdapter::new(EchoBackend);
        let (tx, rx) = bounded(1);

        evaluator.evaluate_runs_async(
            vec![run_config(1, 1, 5.0)],
            Box::new(move |result| {
                tx.send(result.map(|runs| runs.len())).unwrap();
            }),
            None,
        );

        let count = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
        assert_eq!(count, 1);
        evaluator.wait_for_outstanding_evaluations();
        assert_eq!(evaluator.outstanding_batch_count(), 0);
    }

    #[test]
    fn test_shutdown_rejects_runs() {
        let evaluator = SyncEvaluatorAdapter::new(EchoBackend);
        evaluator.notify_shutdown();

        let result = evaluator.evaluate(&[run_config(1, 1, 5.0)]);
        assert!(matches!(result, Err(EngineError::EvaluatorShutdown(_))));
    }
}
