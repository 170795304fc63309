// src/decorators/log_every.rs
//! Logs every scheduled request and every completed run at debug level

use crate::decorators::map_callback;
use crate::evaluator::{Evaluator, EvaluatorCallback, SharedObserver};
use crate::model::{AlgorithmRun, RunConfig};
use crate::utils::errors::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

pub struct LogEveryEvaluator {
    inner: Arc<dyn Evaluator>,
    run_config_only: bool,
    logged: Arc<AtomicU64>,
}

impl LogEveryEvaluator {
    /// With `run_config_only` completed runs are logged by request only
    pub fn new(inner: Arc<dyn Evaluator>, run_config_only: bool) -> Self {
        Self {
            inner,
            run_config_only,
            logged: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Completed runs logged so far
    pub fn logged_runs(&self) -> u64 {
        self.logged.load(Ordering::Relaxed)
    }

    fn log_scheduled(runs: &[RunConfig]) {
        for rc in runs {
            debug!("Run Scheduled: {}", rc);
        }
    }
}

fn log_completed(runs: &[AlgorithmRun], run_config_only: bool, logged: &AtomicU64) {
    for run in runs {
        if run_config_only {
            debug!("Run Completed: {}", run.run_config());
        } else {
            debug!("Run Completed: {}", run);
        }
    }
    logged.fetch_add(runs.len() as u64, Ordering::Relaxed);
}

impl Evaluator for LogEveryEvaluator {
    fn evaluate_runs(
        &self,
        runs: &[RunConfig],
        observer: Option<SharedObserver>,
    ) -> Result<Vec<AlgorithmRun>> {
        Self::log_scheduled(runs);
        let completed = self.inner.evaluate_runs(runs, observer)?;
        log_completed(&completed, self.run_config_only, &self.logged);
        Ok(completed)
    }

    fn evaluate_runs_async(
        &self,
        runs: Vec<RunConfig>,
        callback: EvaluatorCallback,
        observer: Option<SharedObserver>,
    ) {
        Self::log_scheduled(&runs);
        let run_config_only = self.run_config_only;
        let logged = Arc::clone(&self.logged);

        self.inner.evaluate_runs_async(
            runs,
            map_callback(callback, move |completed| {
                log_completed(&completed, run_config_only, &logged);
                Ok(completed)
            }),
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
    use crate::model::algorithm_run::test_support::run_config;
    use crate::model::RunResult;

    #[test]
    fn test_outcomes_pass_through_unchanged() {
        let (_backend, inner) = scripted(RunResult::Unsat, 2.5);
        let evaluator = LogEveryEvaluator::new(inner, false);

        let runs = evaluator
            .evaluate(&[run_config(1, 1, 5.0), run_config(2, 1, 5.0)])
            .unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().all(|r| r.run_result() == RunResult::Unsat && r.runtime() == 2.5));
        assert_eq!(evaluator.logged_runs(), 2);
    }

    #[test]
    fn test_async_runs_logged() {
        let (_backend, inner) = scripted(RunResult::Sat, 1.0);
        let evaluator = LogEveryEvaluator::new(inner, true);
        let (tx, rx) = crossbeam_channel::bounded(1);

        evaluator.evaluate_runs_async(
            vec![run_config(1, 1, 5.0)],
            Box::new(move |result| tx.send(result.map(|r| r.len())).unwrap()),
            None,
        );

        assert_eq!(rx.recv().unwrap().unwrap(), 1);
        assert_eq!(evaluator.logged_runs(), 1);
    }
}
