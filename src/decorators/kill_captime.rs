// src/decorators/kill_captime.rs
//! Kills runs that ignore their cutoff
//!
//! Every submission gets an observer that inspects RUNNING snapshots and
//! kills any run whose runtime exceeds `factor × cutoff`. Within one
//! submission each request is killed at most once; the kill-once set lives
//! with the submission's observer and is dropped with it. The caller's own observer, if any, still receives
//! every snapshot.

use crate::evaluator::{Evaluator, EvaluatorCallback, RunObserver, SharedObserver};
use crate::model::{AlgorithmRun, KillableRun, RunConfig};
use crate::utils::errors::{EngineError, Result};
use dashmap::DashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::warn;

struct KillingObserver {
    scaling_factor: f64,
    killed: DashSet<RunConfig>,
    total_killed: Arc<AtomicUsize>,
    inner: Option<SharedObserver>,
}

impl RunObserver for KillingObserver {
    fn current_status(&self, runs: &[KillableRun]) {
        for snapshot in runs.iter().filter(|s| s.is_running()) {
            let run = snapshot.run();
            let cutoff = run.run_config().cutoff_time();

            if cutoff * self.scaling_factor < run.runtime()
                && self.killed.insert(run.run_config().clone())
            {
                warn!(
                    "Killed run {} at {} for exceeding {} times its cutoff time of {} (secs)",
                    run.run_config(),
                    run.runtime(),
                    self.scaling_factor,
                    cutoff
                );
                self.total_killed.fetch_add(1, Ordering::Relaxed);
                snapshot.kill();
            }
        }

        if let Some(inner) = &self.inner {
            inner.current_status(runs);
        }
    }
}

pub struct KillCaptimeExceedingEvaluator {
    inner: Arc<dyn Evaluator>,
    scaling_factor: f64,
    total_killed: Arc<AtomicUsize>,
}

impl KillCaptimeExceedingEvaluator {
    pub fn new(inner: Arc<dyn Evaluator>, scaling_factor: f64) -> Result<Self> {
        if scaling_factor.is_nan() || scaling_factor <= 1.0 {
            return Err(EngineError::Parameter(
                "Scaling Factor for killing cannot be less than or equal to 1.0".to_string(),
            ));
        }
        if scaling_factor < 2.0 {
            warn!("Scaling factors less than 2.0 are STRONGLY discouraged, as the runtime observations we make are only very approximate.");
        }

        Ok(Self {
            inner,
            scaling_factor,
            total_killed: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Runs killed so far, over all submissions
    pub fn killed_count(&self) -> usize {
        self.total_killed.load(Ordering::Relaxed)
    }

    fn observer(&self, inner: Option<SharedObserver>) -> Option<SharedObserver> {
        Some(Arc::new(KillingObserver {
            scaling_factor: self.scaling_factor,
            killed: DashSet::new(),
            total_killed: Arc::clone(&self.total_killed),
            inner,
        }) as SharedObserver)
    }
}

impl Evaluator for KillCaptimeExceedingEvaluator {
    fn evaluate_runs(
        &self,
        runs: &[RunConfig],
        observer: Option<SharedObserver>,
    ) -> Result<Vec<AlgorithmRun>> {
        self.inner.evaluate_runs(runs, self.observer(observer))
    }

    fn evaluate_runs_async(
        &self,
        runs: Vec<RunConfig>,
        callback: EvaluatorCallback,
        observer: Option<SharedObserver>,
    ) {
        self.inner
            .evaluate_runs_async(runs, callback, self.observer(observer));
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
