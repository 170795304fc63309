// src/decorators/leaking_memory.rs
//! Deliberate memory leak per submitted run
//!
//! Used to exercise memory-pressure handling of long configuration sessions.
//! The leak size is a constructor argument; nothing is process-wide.

use crate::evaluator::{Evaluator, EvaluatorCallback, SharedObserver};
use crate::model::{AlgorithmRun, RunConfig};
use crate::utils::errors::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

#[derive(Default)]
struct Leaked {
    blocks: Vec<Vec<u8>>,
    total: u64,
}

pub struct LeakingMemoryEvaluator {
    inner: Arc<dyn Evaluator>,
    bytes_per_run: usize,
    leaked: Mutex<Leaked>,
}

impl LeakingMemoryEvaluator {
    pub fn new(inner: Arc<dyn Evaluator>, bytes_per_run: usize) -> Self {
        Self {
            inner,
            bytes_per_run,
            leaked: Mutex::new(Leaked::default()),
        }
    }

    pub fn leaked_bytes(&self) -> u64 {
        self.leaked.lock().total
    }

    /// Number of separate leaked blocks, one per batch
    pub fn leaked_allocations(&self) -> usize {
        self.leaked.lock().blocks.len()
    }

    fn leak(&self, runs: usize) {
        let size = runs.saturating_mul(self.bytes_per_run);
        if size == 0 {
            return;
        }

        let mut leaked = self.leaked.lock();
        leaked.blocks.push(vec![0xA5; size]);
        leaked.total += size as u64;
        warn!(
            "Leaking >= {} bytes of memory, total leaked: {} MB",
            size,
            leaked.total / 1024 / 1024
        );
    }
}

impl Evaluator for LeakingMemoryEvaluator {
    fn evaluate_runs(
        &self,
        runs: &[RunConfig],
        observer: Option<SharedObserver>,
    ) -> Result<Vec<AlgorithmRun>> {
        let completed = self.inner.evaluate_runs(runs, observer)?;
        self.leak(runs.len());
        Ok(completed)
    }

    fn evaluate_runs_async(
        &self,
        runs: Vec<RunConfig>,
        callback: EvaluatorCallback,
        observer: Option<SharedObserver>,
    ) {
        let count = runs.len();
        self.inner.evaluate_runs_async(runs, callback, observer);
        self.leak(count);
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
    fn test_leaks_per_run() {
        let (_backend, inner) = scripted(RunResult::Sat, 1.0);
        let evaluator = LeakingMemoryEvaluator::new(inner, 2048);

        evaluator
            .evaluate(&[run_config(1, 1, 5.0), run_config(1, 2, 5.0)])
            .unwrap();
        assert_eq!(evaluator.leaked_bytes(), 4096);

        evaluator.evaluate(&[run_config(1, 3, 5.0)]).unwrap();
        assert_eq!(evaluator.leaked_bytes(), 6144);
        assert_eq!(evaluator.leaked_allocations(), 2);
    }

    #[test]
    fn test_zero_leak_is_inert() {
        let (_backend, inner) = scripted(RunResult::Sat, 1.0);
        let evaluator = LeakingMemoryEvaluator::new(inner, 0);

        evaluator.evaluate(&[run_config(1, 1, 5.0)]).unwrap();
        assert_eq!(evaluator.leaked_bytes(), 0);
    }
}
