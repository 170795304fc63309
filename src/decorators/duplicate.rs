// src/decorators/duplicate.rs
//! Duplicate request detection
//!
//! Two requests in the same batch that are equal by [`RunConfig`] equality
//! (instance, seed and configuration; the cutoff is ignored) are almost
//! certainly a scheduling bug upstream.

use crate::evaluator::{Evaluator, EvaluatorCallback, SharedObserver};
use crate::model::{AlgorithmRun, RunConfig};
use crate::utils::errors::{EngineError, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::error;

pub struct DuplicateGuardEvaluator {
    inner: Arc<dyn Evaluator>,
    throw_on_duplicate: bool,
}

impl DuplicateGuardEvaluator {
    /// With `throw_on_duplicate` unset duplicates are only logged
    pub fn new(inner: Arc<dyn Evaluator>, throw_on_duplicate: bool) -> Self {
        Self {
            inner,
            throw_on_duplicate,
        }
    }

    fn check_run_configs(&self, runs: &[RunConfig]) -> Result<()> {
        let duplicates = find_duplicates(runs);
        if duplicates.is_empty() {
            return Ok(());
        }

        error!("Duplicate Run Configurations Requested this is almost certainly a bug");
        error!("Duplicate Run Configs Follow:");
        for rc in &duplicates {
            error!("\tDuplicate Run Config: {}", rc);
        }
        error!("All Run Configs follow:");
        for rc in runs {
            error!("\tRun Config: {}", rc);
        }

        if self.throw_on_duplicate {
            return Err(EngineError::DuplicateRun(format!(
                "{} duplicate run configurations cannot be part of the same batch",
                duplicates.len()
            )));
        }
        Ok(())
    }
}

/// Each request that appears more than once, reported once, in first-seen order
fn find_duplicates(runs: &[RunConfig]) -> Vec<&RunConfig> {
    let mut seen = HashSet::with_capacity(runs.len());
    let mut reported = HashSet::new();
    let mut duplicates = Vec::new();

    for rc in runs {
        if !seen.insert(rc) && reported.insert(rc) {
            duplicates.push(rc);
        }
    }
    duplicates
}

impl Evaluator for DuplicateGuardEvaluator {
    fn evaluate_runs(
        &self,
        runs: &[RunConfig],
        observer: Option<SharedObserver>,
    ) -> Result<Vec<AlgorithmRun>> {
        self.check_run_configs(runs)?;
        self.inner.evaluate_runs(runs, observer)
    }

    fn evaluate_runs_async(
        &self,
        runs: Vec<RunConfig>,
        callback: EvaluatorCallback,
        observer: Option<SharedObserver>,
    ) {
        if let Err(e) = self.check_run_configs(&runs) {
            callback(Err(e));
            return;
        }
        self.inner.evaluate_runs_async(runs, callback, observer);
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
    use crossbeam_channel::bounded;

    #[test]
    fn test_find_duplicates_ignores_cutoff() {
        let runs = vec![
            run_config(1, 1, 5.0),
            run_config(1, 2, 5.0),
            run_config(1, 1, 9.0),
            run_config(1, 1, 5.0),
        ];

        let duplicates = find_duplicates(&runs);
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].seed(), 1);
    }

    #[test]
    fn test_duplicate_rejected_before_forwarding() {
        let (backend, inner) = scripted(RunResult::Sat, 1.0);
        let evaluator = DuplicateGuardEvaluator::new(inner, true);

        let result = evaluator.evaluate(&[run_config(1, 1, 5.0), run_config(1, 1, 5.0)]);
        assert!(matches!(result, Err(EngineError::DuplicateRun(_))));
        assert!(backend.batches.lock().is_empty());
    }

    #[test]
    fn test_duplicate_logged_only() {
        let (backend, inner) = scripted(RunResult::Sat, 1.0);
        let evaluator = DuplicateGuardEvaluator::new(inner, false);

        let runs = evaluator
            .evaluate(&[run_config(1, 1, 5.0), run_config(1, 1, 5.0)])
            .unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(backend.batches.lock().len(), 1);
    }

    #[test]
    fn test_async_duplicate_reports_through_callback() {
        let (_backend, inner) = scripted(RunResult::Sat, 1.0);
        let evaluator = DuplicateGuardEvaluator::new(inner, true);
        let (tx, rx) = bounded(1);

        evaluator.evaluate_runs_async(
            vec![run_config(2, 3, 5.0), run_config(2, 3, 5.0)],
            Box::new(move |result| tx.send(result.is_err()).unwrap()),
            None,
        );
        assert!(rx.recv().unwrap());
    }
}
