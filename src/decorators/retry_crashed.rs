// src/decorators/retry_crashed.rs
//! Retries crashed runs
//!
//! Crashed outcomes are resubmitted up to `retries` times and replaced in
//! place, so callers see outcomes in request order. Only the outcomes
//! returned to the caller are counted; retried attempts are not.

use crate::evaluator::{Evaluator, EvaluatorCallback, SharedObserver};
use crate::model::{AlgorithmRun, RunConfig, RunResult};
use crate::utils::errors::{EngineError, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

pub struct RetryCrashedRunsEvaluator {
    inner: Arc<dyn Evaluator>,
    retries: u32,
    run_count: Arc<AtomicU64>,
}

impl RetryCrashedRunsEvaluator {
    pub fn new(inner: Arc<dyn Evaluator>, retries: u32) -> Self {
        Self {
            inner,
            retries,
            run_count: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }
}

fn crashed_indices(runs: &[AlgorithmRun]) -> Vec<usize> {
    runs.iter()
        .enumerate()
        .filter(|(_, run)| run.run_result() == RunResult::Crashed)
        .map(|(i, _)| i)
        .collect()
}

fn replace_retried(
    runs: &mut [AlgorithmRun],
    indices: &[usize],
    retried: Vec<AlgorithmRun>,
) -> Result<()> {
    if retried.len() != indices.len() {
        return Err(EngineError::Internal(format!(
            "retried {} crashed runs but received {} outcomes",
            indices.len(),
            retried.len()
        )));
    }

    for (&i, run) in indices.iter().zip(retried) {
        runs[i] = run;
    }
    Ok(())
}

/// Continue an async batch: retry what crashed, or hand the batch back
struct AsyncRetry {
    inner: Arc<dyn Evaluator>,
    retries: u32,
    run_count: Arc<AtomicU64>,
    observer: Option<SharedObserver>,
    callback: EvaluatorCallback,
}

impl AsyncRetry {
    fn proceed(self, runs: Vec<AlgorithmRun>, attempt: u32) {
        let indices = crashed_indices(&runs);
        if indices.is_empty() || attempt > self.retries {
            if indices.is_empty() {
                debug!("No crashed runs to retry");
            }
            self.run_count.fetch_add(runs.len() as u64, Ordering::AcqRel);
            (self.callback)(Ok(runs));
            return;
        }

        info!("Retrying {} crashed runs (Attempt {})", indices.len(), attempt);
        let requests: Vec<RunConfig> = indices.iter().map(|&i| runs[i].run_config().clone()).collect();
        let inner = Arc::clone(&self.inner);
        let observer = self.observer.clone();

        inner.evaluate_runs_async(
            requests,
            Box::new(move |result| {
                let mut runs = runs;
                match result.and_then(|retried| replace_retried(&mut runs, &indices, retried)) {
                    Ok(()) => self.proceed(runs, attempt + 1),
                    Err(e) => (self.callback)(Err(e)),
                }
            }),
            observer,
        );
    }
}

impl Evaluator for RetryCrashedRunsEvaluator {
    fn evaluate_runs(
        &self,
        runs: &[RunConfig],
        observer: Option<SharedObserver>,
    ) -> Result<Vec<AlgorithmRun>> {
        let mut completed = self.inner.evaluate_runs(runs, observer.clone())?;

        for attempt in 1..=self.retries {
            let indices = crashed_indices(&completed);
            if indices.is_empty() {
                debug!("No crashed runs to retry");
                break;
            }

            info!("Retrying {} crashed runs (Attempt {})", indices.len(), attempt);
            let requests: Vec<RunConfig> = indices
                .iter()
                .map(|&i| completed[i].run_config().clone())
                .collect();
            let retried = self.inner.evaluate_runs(&requests, observer.clone())?;
            replace_retried(&mut completed, &indices, retried)?;
        }

        self.run_count
            .fetch_add(completed.len() as u64, Ordering::AcqRel);
        Ok(completed)
    }

    fn evaluate_runs_async(
        &self,
        runs: Vec<RunConfig>,
        callback: EvaluatorCallback,
        observer: Option<SharedObserver>,
    ) {
        let retry = AsyncRetry {
            inner: Arc::clone(&self.inner),
            retries: self.retries,
            run_count: Arc::clone(&self.run_count),
            observer: observer.clone(),
            callback,
        };

        self.inner.evaluate_runs_async(
            runs,
            Box::new(move |result| match result {
                Ok(completed) => retry.proceed(completed, 1),
                Err(e) => (retry.callback)(Err(e)),
            }),
            observer,
        );
    }

    fn run_count(&self) -> u64 {
        self.run_count.load(Ordering::Acquire)
    }

    fn seek(&self, runs: &[AlgorithmRun]) {
        self.inner.seek(runs);
        self.run_count.fetch_add(runs.len() as u64, Ordering::AcqRel);
    }

    delegate_evaluator!(inner =>
        is_run_final,
        are_runs_persisted,
        are_runs_observable,
        notify_shutdown,
        outstanding_run_count,
        outstanding_batch_count,
        wait_for_outstanding_evaluations,
    );
}
