// src/decorators/mod.rs
//! Evaluator decorators
//!
//! Each decorator wraps exactly one `Arc<dyn Evaluator>` and adds a single
//! cross-cutting behaviour while preserving the full contract:
//!
//! - **Bounded**: caps outstanding runs with a reducible counting resource
//! - **DuplicateGuard**: rejects (or logs) batches with duplicate requests
//! - **TimingInvariant**: runtime ≥ cutoff becomes TIMEOUT at the cutoff
//! - **WalltimeAsRuntime**: reports wall-clock time as runtime
//! - **NonBlockingAsync**: queues async submissions for a single forwarder
//! - **LogEvery / LeakingMemory / UncleanShutdownDetector**: instrumentation
//! - **AbortOnCrash / AbortOnFirstRunCrash / RetryCrashedRuns**: crash policy
//! - **KillCaptimeExceeding / RuntimeConsistencyChecker**: runtime sanity
//! - **OutstandingEvaluations / NotifyTermination**: bookkeeping and events
//!
//! # Canonical order
//!
//! ```text
//! UncleanShutdown ─> Outstanding ─> NotifyTermination ─> NonBlocking ─> Bounded
//!   ─> LeakingMemory ─> LogEvery ─> DuplicateGuard ─> KillCaptime ─> Walltime
//!   ─> TimingInvariant ─> ConsistencyChecker ─> AbortOnCrash ─> Retry ─> backend
//! ```
//!
//! Bounding must sit inside the non-blocking queue, otherwise the queue
//! absorbs every submission and the bound never applies.

/// Forward the named [`Evaluator`](crate::evaluator::Evaluator) methods to a
/// field holding the wrapped evaluator
macro_rules! delegate_evaluator {
    (@item $f:ident evaluate_runs) => {
        fn evaluate_runs(
            &self,
            runs: &[$crate::model::RunConfig],
            observer: Option<$crate::evaluator::SharedObserver>,
        ) -> $crate::utils::errors::Result<Vec<$crate::model::AlgorithmRun>> {
            self.$f.evaluate_runs(runs, observer)
        }
    };
    (@item $f:ident evaluate_runs_async) => {
        fn evaluate_runs_async(
            &self,
            runs: Vec<$crate::model::RunConfig>,
            callback: $crate::evaluator::EvaluatorCallback,
            observer: Option<$crate::evaluator::SharedObserver>,
        ) {
            self.$f.evaluate_runs_async(runs, callback, observer)
        }
    };
    (@item $f:ident is_run_final) => {
        fn is_run_final(&self) -> bool {
            self.$f.is_run_final()
        }
    };
    (@item $f:ident are_runs_persisted) => {
        fn are_runs_persisted(&self) -> bool {
            self.$f.are_runs_persisted()
        }
    };
    (@item $f:ident are_runs_observable) => {
        fn are_runs_observable(&self) -> bool {
            self.$f.are_runs_observable()
        }
    };
    (@item $f:ident notify_shutdown) => {
        fn notify_shutdown(&self) {
            self.$f.notify_shutdown()
        }
    };
    (@item $f:ident run_count) => {
        fn run_count(&self) -> u64 {
            self.$f.run_count()
        }
    };
    (@item $f:ident outstanding_run_count) => {
        fn outstanding_run_count(&self) -> usize {
            self.$f.outstanding_run_count()
        }
    };
    (@item $f:ident outstanding_batch_count) => {
        fn outstanding_batch_count(&self) -> usize {
            self.$f.outstanding_batch_count()
        }
    };
    (@item $f:ident wait_for_outstanding_evaluations) => {
        fn wait_for_outstanding_evaluations(&self) {
            self.$f.wait_for_outstanding_evaluations()
        }
    };
    (@item $f:ident seek) => {
        fn seek(&self, runs: &[$crate::model::AlgorithmRun]) {
            self.$f.seek(runs)
        }
    };
    ($f:ident => $($method:ident),+ $(,)?) => {
        $( delegate_evaluator!(@item $f $method); )+
    };
}

/// Wrap `callback` so successful outcomes pass through `process` first.
/// A failing `process` turns the batch into a failure.
pub(crate) fn map_callback<F>(
    callback: crate::evaluator::EvaluatorCallback,
    process: F,
) -> crate::evaluator::EvaluatorCallback
where
    F: FnOnce(Vec<crate::model::AlgorithmRun>) -> crate::utils::errors::Result<Vec<crate::model::AlgorithmRun>>
        + Send
        + 'static,
{
    Box::new(move |result| callback(result.and_then(process)))
}

pub mod abort_on_crash;
pub mod bounded;
pub mod consistency;
pub mod duplicate;
pub mod kill_captime;
pub mod leaking_memory;
pub mod log_every;
pub mod non_blocking;
pub mod notify_termination;
pub mod outstanding;
pub mod resource;
pub mod retry_crashed;
pub mod timing_invariant;
pub mod unclean_shutdown;
pub mod walltime;

pub use abort_on_crash::{AbortOnCrashEvaluator, AbortOnFirstRunCrashEvaluator};
pub use bounded::BoundedEvaluator;
pub use consistency::RuntimeConsistencyChecker;
pub use duplicate::DuplicateGuardEvaluator;
pub use kill_captime::KillCaptimeExceedingEvaluator;
pub use leaking_memory::LeakingMemoryEvaluator;
pub use log_every::LogEveryEvaluator;
pub use non_blocking::NonBlockingAsyncEvaluator;
pub use notify_termination::NotifyTerminationEvaluator;
pub use outstanding::OutstandingEvaluationsEvaluator;
pub use resource::{BoundedResource, ResourcePermit};
pub use retry_crashed::RetryCrashedRunsEvaluator;
pub use timing_invariant::TimingInvariantEvaluator;
pub use unclean_shutdown::UncleanShutdownDetector;
pub use walltime::WalltimeAsRuntimeEvaluator;
