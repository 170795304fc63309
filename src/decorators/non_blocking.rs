// src/decorators/non_blocking.rs
//! Non-blocking async submission
//!
//! `evaluate_runs_async` only enqueues; a single submission thread forwards
//! batches to the wrapped evaluator in the order they arrived. Backpressure
//! from the wrapped evaluator (a bound on concurrent runs, say) blocks that
//! thread instead of the caller.
//!
//! ```text
//! caller ──push──> [unbounded queue] ──> submission thread ──> inner.evaluate_runs_async
//! ```

use crate::evaluator::{
    Evaluator, EvaluatorCallback, OutstandingGuard, OutstandingTracker, SharedObserver,
};
use crate::model::{AlgorithmRun, RunConfig};
use crate::utils::errors::{EngineError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

const SUBMISSION_THREAD_NAME: &str = "Non-Blocking Async Submission Thread";

struct Submission {
    runs: Vec<RunConfig>,
    callback: EvaluatorCallback,
    observer: Option<SharedObserver>,
    queued: OutstandingGuard,
}

pub struct NonBlockingAsyncEvaluator {
    inner: Arc<dyn Evaluator>,
    sender: RwLock<Option<Sender<Submission>>>,
    queued: OutstandingTracker,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl NonBlockingAsyncEvaluator {
    pub fn new(inner: Arc<dyn Evaluator>) -> Result<Self> {
        let (sender, receiver) = unbounded();
        let worker_inner = Arc::clone(&inner);
        let worker = thread::Builder::new()
            .name(SUBMISSION_THREAD_NAME.to_string())
            .spawn(move || forward_submissions(worker_inner, receiver))?;

        Ok(Self {
            inner,
            sender: RwLock::new(Some(sender)),
            queued: OutstandingTracker::new(),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Batches accepted but not yet handed to the wrapped evaluator
    pub fn queued_batches(&self) -> usize {
        self.queued.outstanding_batches()
    }
}

fn forward_submissions(inner: Arc<dyn Evaluator>, submissions: Receiver<Submission>) {
    for submission in submissions.iter() {
        let Submission {
            runs,
            callback,
            observer,
            queued,
        } = submission;
        inner.evaluate_runs_async(runs, callback, observer);
        drop(queued);
    }
    debug!("{} exiting", SUBMISSION_THREAD_NAME);
}

impl Evaluator for NonBlockingAsyncEvaluator {
    fn evaluate_runs_async(
        &self,
        runs: Vec<RunConfig>,
        callback: EvaluatorCallback,
        observer: Option<SharedObserver>,
    ) {
        let sender = self.sender.read().clone();
        let sender = match sender {
            Some(sender) => sender,
            None => {
                callback(Err(EngineError::EvaluatorShutdown(
                    "non-blocking submission queue is closed".to_string(),
                )));
                return;
            }
        };

        let queued = self.queued.begin(runs.len());
        if let Err(rejected) = sender.send(Submission {
            runs,
            callback,
            observer,
            queued,
        }) {
            let Submission { callback, .. } = rejected.0;
            callback(Err(EngineError::EvaluatorShutdown(format!(
                "{} has exited",
                SUBMISSION_THREAD_NAME
            ))));
        }
    }

    fn evaluate_runs(
        &self,
        runs: &[RunConfig],
        observer: Option<SharedObserver>,
    ) -> Result<Vec<AlgorithmRun>> {
        self.inner.evaluate_runs(runs, observer)
    }

    /// Shut the wrapped evaluator down first so a submission blocked on it
    /// is released, then drain the queue and join the submission thread
    fn notify_shutdown(&self) {
        self.inner.notify_shutdown();
        self.sender.write().take();

        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                error!("{} panicked", SUBMISSION_THREAD_NAME);
            }
        }
    }

    fn outstanding_run_count(&self) -> usize {
        self.queued.outstanding_runs() + self.inner.outstanding_run_count()
    }

    fn outstanding_batch_count(&self) -> usize {
        self.queued_batches() + self.inner.outstanding_batch_count()
    }

    fn wait_for_outstanding_evaluations(&self) {
        self.queued.wait_until_idle();
        self.inner.wait_for_outstanding_evaluations();
    }

    delegate_evaluator!(inner =>
        is_run_final,
        are_runs_persisted,
        are_runs_observable,
        run_count,
        seek,
    );
}

impl Drop for NonBlockingAsyncEvaluator {
    fn drop(&mut self) {
        // Closing the channel lets the submission thread drain and exit
        self.sender.write().take();
    }
}
