// src/decorators/bounded.rs
//! Bounded concurrency
//!
//! Caps the number of runs outstanding against the wrapped evaluator.
//! A batch larger than the free capacity is split into chunks that are
//! forwarded as permits become available; the caller's callback fires once
//! with every outcome in submission order.

use crate::decorators::resource::BoundedResource;
use crate::evaluator::{Evaluator, EvaluatorCallback, SharedObserver};
use crate::model::{AlgorithmRun, RunConfig};
use crate::utils::errors::{EngineError, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Reassembles chunk results into one callback invocation
struct SplitBatch {
    state: Mutex<SplitState>,
}

struct SplitState {
    results: Vec<Option<AlgorithmRun>>,
    remaining: usize,
    callback: Option<EvaluatorCallback>,
}

impl SplitBatch {
    fn new(size: usize, callback: EvaluatorCallback) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SplitState {
                results: vec![None; size],
                remaining: size,
                callback: Some(callback),
            }),
        })
    }

    fn is_failed(&self) -> bool {
        self.state.lock().callback.is_none()
    }

    fn complete(&self, offset: usize, expected: usize, result: Result<Vec<AlgorithmRun>>) {
        let mut state = self.state.lock();
        if state.callback.is_none() {
            return;
        }

        let runs = match result {
            Ok(runs) if runs.len() == expected => runs,
            Ok(runs) => {
                let callback = state.callback.take();
                drop(state);
                if let Some(callback) = callback {
                    callback(Err(EngineError::Internal(format!(
                        "expected {} outcomes from a bounded chunk, got {}",
                        expected,
                        runs.len()
                    ))));
                }
                return;
            }
            Err(e) => {
                let callback = state.callback.take();
                drop(state);
                if let Some(callback) = callback {
                    callback(Err(e));
                }
                return;
            }
        };

        let count = runs.len();
        for (i, run) in runs.into_iter().enumerate() {
            if let Some(slot) = state.results.get_mut(offset + i) {
                *slot = Some(run);
            }
        }
        state.remaining = state.remaining.saturating_sub(count);

        if state.remaining == 0 {
            let callback = state.callback.take();
            let results: Option<Vec<AlgorithmRun>> = state.results.iter_mut().map(Option::take).collect();
            drop(state);

            if let Some(callback) = callback {
                callback(results.ok_or_else(|| {
                    EngineError::Internal("bounded batch completed with missing outcomes".to_string())
                }));
            }
        }
    }

    fn fail(&self, error: EngineError) {
        let callback = self.state.lock().callback.take();
        if let Some(callback) = callback {
            callback(Err(error));
        }
    }
}

/// Limits outstanding runs on the wrapped evaluator
pub struct BoundedEvaluator {
    inner: Arc<dyn Evaluator>,
    resource: Arc<BoundedResource>,
    bound: usize,
}

impl BoundedEvaluator {
    pub fn new(inner: Arc<dyn Evaluator>, bound: usize) -> Result<Self> {
        if bound == 0 {
            return Err(EngineError::Parameter(
                "Bound on concurrent runs must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            inner,
            resource: BoundedResource::new(bound),
            bound,
        })
    }

    pub fn bound(&self) -> usize {
        self.bound
    }

    /// Permits not currently held by in-flight runs
    pub fn available_capacity(&self) -> isize {
        self.resource.available_permits()
    }
}

impl Evaluator for BoundedEvaluator {
    fn evaluate_runs(
        &self,
        runs: &[RunConfig],
        observer: Option<SharedObserver>,
    ) -> Result<Vec<AlgorithmRun>> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.evaluate_runs_async(
            runs.to_vec(),
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
            observer,
        );

        rx.recv().map_err(|_| {
            EngineError::EvaluatorShutdown("bounded evaluation dropped its callback".to_string())
        })?
    }

    fn evaluate_runs_async(
        &self,
        runs: Vec<RunConfig>,
        callback: EvaluatorCallback,
        observer: Option<SharedObserver>,
    ) {
        if runs.is_empty() {
            callback(Ok(Vec::new()));
            return;
        }

        let batch = SplitBatch::new(runs.len(), callback);
        let mut offset = 0;

        while offset < runs.len() {
            if batch.is_failed() {
                debug!("Stopping submission of a failed bounded batch at offset {}", offset);
                return;
            }

            let permit = match self.resource.acquire_up_to(runs.len() - offset) {
                Ok(permit) => permit,
                Err(e) => {
                    batch.fail(e);
                    return;
                }
            };

            let count = permit.count();
            let chunk = runs[offset..offset + count].to_vec();
            debug!(
                "Submitting {} of {} runs ({} permits left)",
                count,
                runs.len(),
                self.resource.available_permits()
            );

            let chunk_batch = Arc::clone(&batch);
            let start = offset;
            self.inner.evaluate_runs_async(
                chunk,
                Box::new(move |result| {
                    drop(permit);
                    chunk_batch.complete(start, count, result);
                }),
                observer.clone(),
            );

            offset += count;
        }
    }

    fn notify_shutdown(&self) {
        self.resource.close();
        self.inner.notify_shutdown();
    }

    delegate_evaluator!(inner =>
        is_run_final,
        are_runs_persisted,
        are_runs_observable,
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
    use proptest::prelude::*;
    use std::sync::atomic::Ordering;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_never_exceeds_bound() {
        let backend = Arc::new(ScriptedBackend::new(RunResult::Sat, 1.0).with_delay(Duration::from_millis(20)));
        let inner = Arc::new(crate::evaluator::SyncEvaluatorAdapter::new(Arc::clone(&backend)));
        let bound = 3;
        let evaluator = Arc::new(BoundedEvaluator::new(inner, bound).unwrap());

        let runs: Vec<RunConfig> = (0..(bound as i64 + 5)).map(|s| run_config(1, s, 5.0)).collect();
        let completed = evaluator.evaluate(&runs).unwrap();

        assert_eq!(completed.len(), runs.len());
        for (run, rc) in completed.iter().zip(&runs) {
            assert_eq!(run.run_config(), rc);
        }
        assert!(backend.max_in_flight.load(Ordering::SeqCst) <= bound);
        assert_eq!(evaluator.available_capacity(), bound as isize);
    }

    #[test]
    fn test_concurrent_callers_share_bound() {
        let backend = Arc::new(ScriptedBackend::new(RunResult::Sat, 1.0).with_delay(Duration::from_millis(10)));
        let inner = Arc::new(crate::evaluator::SyncEvaluatorAdapter::new(Arc::clone(&backend)));
        let evaluator = Arc::new(BoundedEvaluator::new(inner, 2).unwrap());

        let mut handles = vec![];
        for caller in 0..4u32 {
            let e = Arc::clone(&evaluator);
            handles.push(thread::spawn(move || {
                let runs: Vec<RunConfig> = (0..3).map(|s| run_config(caller, s, 5.0)).collect();
                e.evaluate(&runs).unwrap().len()
            }));
        }

        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 12);
        assert!(backend.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_zero_bound_rejected() {
        let (_backend, inner) = scripted(RunResult::Sat, 1.0);
        assert!(BoundedEvaluator::new(inner, 0).is_err());
    }

    #[test]
    fn test_permits_released_on_failure() {
        let (_backend, inner) = scripted(RunResult::Sat, 1.0);
        let evaluator = BoundedEvaluator::new(inner.clone(), 2).unwrap();
        inner.notify_shutdown();

        let result = evaluator.evaluate(&[run_config(1, 1, 5.0)]);
        assert!(result.is_err());
        assert_eq!(evaluator.available_capacity(), 2);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn proptest_outcomes_keep_submission_order(bound in 1usize..5, batch in 1usize..16) {
            let (backend, inner) = scripted(RunResult::Sat, 1.0);
            let evaluator = BoundedEvaluator::new(inner, bound).unwrap();

            let runs: Vec<RunConfig> = (0..batch as i64).map(|s| run_config(1, s, 5.0)).collect();
            let completed = evaluator.evaluate(&runs).unwrap();

            prop_assert_eq!(completed.len(), runs.len());
            for (run, rc) in completed.iter().zip(&runs) {
                prop_assert_eq!(run.run_config(), rc);
            }
            prop_assert!(backend.max_in_flight.load(Ordering::SeqCst) <= bound);
        }
    }
}
