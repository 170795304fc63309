// src/evaluator/mod.rs
//! Target algorithm evaluator contract
//!
//! An evaluator executes batches of [`RunConfig`]s against a backend and
//! returns their [`AlgorithmRun`] outcomes, either synchronously or through a
//! callback that fires exactly once per batch.
//!
//! - **Evaluator**: the contract every backend and decorator implements
//! - **EvaluatorCallback / RunObserver**: async completion and progress
//! - **SyncEvaluatorAdapter**: turns a blocking [`RunExecutor`] into an evaluator
//! - **OutstandingTracker**: outstanding run/batch accounting
//! - **factory**: assembles a backend and its decorator chain from options
//!
//! # Architecture
//!
//! ```text
//!  caller ──> Decorator ──> Decorator ──> ... ──> Backend
//!               (Arc<dyn Evaluator>, one link per decorator)
//!
//!  evaluate_runs_async(batch, callback)
//!      └─> callback(Ok(runs)) | callback(Err(abort))   exactly once
//! ```

pub mod adapter;
pub mod callback;
pub mod factory;
pub mod tracker;

use crate::model::{AlgorithmRun, RunConfig};
use crate::utils::errors::Result;

pub use adapter::{RunExecutor, SyncEvaluatorAdapter};
pub use callback::{callback, EvaluatorCallback, RunObserver, SharedObserver};
pub use factory::{build_evaluator, BackendKind, EvaluatorOptions};
pub use tracker::{OutstandingGuard, OutstandingTracker};

/// Executes run requests against a target algorithm backend
pub trait Evaluator: Send + Sync {
    /// Evaluate a batch, blocking until every outcome is known
    fn evaluate_runs(
        &self,
        runs: &[RunConfig],
        observer: Option<SharedObserver>,
    ) -> Result<Vec<AlgorithmRun>>;

    /// Submit a batch and return immediately. `callback` is invoked exactly
    /// once, not necessarily on the calling thread.
    fn evaluate_runs_async(
        &self,
        runs: Vec<RunConfig>,
        callback: EvaluatorCallback,
        observer: Option<SharedObserver>,
    );

    /// Synchronous evaluation without an observer
    fn evaluate(&self, runs: &[RunConfig]) -> Result<Vec<AlgorithmRun>> {
        self.evaluate_runs(runs, None)
    }

    /// Whether re-submitting the same request is guaranteed to return the
    /// same outcome
    fn is_run_final(&self) -> bool;

    /// Whether outcomes are stored somewhere and can be replayed
    fn are_runs_persisted(&self) -> bool;

    /// Whether observers receive intermediate progress
    fn are_runs_observable(&self) -> bool;

    /// Release backend resources. Must be forwarded exactly once per chain.
    fn notify_shutdown(&self);

    /// Runs completed so far
    fn run_count(&self) -> u64;

    /// Runs submitted and not yet completed
    fn outstanding_run_count(&self) -> usize;

    /// Batches submitted and not yet completed
    fn outstanding_batch_count(&self) -> usize;

    /// Block until no batches are outstanding. More may be submitted later.
    fn wait_for_outstanding_evaluations(&self);

    /// Inform the evaluator of outcomes that are already known
    fn seek(&self, runs: &[AlgorithmRun]);
}
