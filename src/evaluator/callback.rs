// src/evaluator/callback.rs
//! Async completion callbacks and progress observers

use crate::model::{AlgorithmRun, KillableRun};
use crate::utils::errors::Result;
use std::sync::Arc;

/// Completion callback for an async batch. `Ok` is success, `Err` failure.
pub type EvaluatorCallback = Box<dyn FnOnce(Result<Vec<AlgorithmRun>>) + Send + 'static>;

/// Box a closure as an [`EvaluatorCallback`]
pub fn callback<F>(f: F) -> EvaluatorCallback
where
    F: FnOnce(Result<Vec<AlgorithmRun>>) + Send + 'static,
{
    Box::new(f)
}

/// Receives progress snapshots of in-flight runs
pub trait RunObserver: Send + Sync {
    fn current_status(&self, runs: &[KillableRun]);
}

impl<F> RunObserver for F
where
    F: Fn(&[KillableRun]) + Send + Sync,
{
    fn current_status(&self, runs: &[KillableRun]) {
        self(runs)
    }
}

pub type SharedObserver = Arc<dyn RunObserver>;
