// src/decorators/notify_termination.rs
//! Publishes completed batches on the event bus
//!
//! Termination conditions subscribed to the bus count runs from the
//! `AlgorithmRunCompleted` event fired here. With `flush` set the batch is
//! only handed back once every handler has seen it, so a caller checking
//! `must_stop()` right after a batch observes the updated counters.

use crate::decorators::map_callback;
use crate::evaluator::{Evaluator, EvaluatorCallback, SharedObserver};
use crate::events::{Event, EventManager};
use crate::model::{AlgorithmRun, RunConfig};
use crate::utils::errors::Result;
use std::sync::Arc;
use tracing::trace;

pub struct NotifyTerminationEvaluator {
    inner: Arc<dyn Evaluator>,
    bus: EventManager,
    flush: bool,
}

impl NotifyTerminationEvaluator {
    pub fn new(inner: Arc<dyn Evaluator>, bus: EventManager, flush: bool) -> Self {
        Self { inner, bus, flush }
    }
}

fn publish(bus: &EventManager, flush: bool, runs: Vec<AlgorithmRun>) -> Result<Vec<AlgorithmRun>> {
    if runs.is_empty() {
        return Ok(runs);
    }

    trace!("Publishing {} completed runs", runs.len());
    bus.fire(Event::completed_runs(runs.clone()))?;
    if flush {
        bus.flush()?;
    }
    Ok(runs)
}

impl Evaluator for NotifyTerminationEvaluator {
    fn evaluate_runs(
        &self,
        runs: &[RunConfig],
        observer: Option<SharedObserver>,
    ) -> Result<Vec<AlgorithmRun>> {
        let completed = self.inner.evaluate_runs(runs, observer)?;
        publish(&self.bus, self.flush, completed)
    }

    fn evaluate_runs_async(
        &self,
        runs: Vec<RunConfig>,
        callback: EvaluatorCallback,
        observer: Option<SharedObserver>,
    ) {
        let bus = self.bus.clone();
        let flush = self.flush;
        self.inner.evaluate_runs_async(
            runs,
            map_callback(callback, move |completed| publish(&bus, flush, completed)),
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
    use crate::events::EventKind;
    use crate::model::algorithm_run::test_support::run_config;
    use crate::model::RunResult;
    use crate::termination::{RunLimitCondition, TerminationCondition};
    use crate::utils::errors::EngineError;

    #[test]
    fn test_flushed_runs_counted_before_return() {
        let bus = EventManager::new().unwrap();
        let condition = Arc::new(RunLimitCondition::new(3));
        Arc::clone(&condition).subscribe_to(&bus).unwrap();

        let (_backend, inner) = scripted(RunResult::Sat, 1.0);
        let evaluator = NotifyTerminationEvaluator::new(inner, bus.clone(), true);

        evaluator
            .evaluate(&[run_config(1, 1, 5.0), run_config(1, 2, 5.0)])
            .unwrap();
        assert_eq!(condition.runs(), 2);
        assert!(!condition.must_stop());

        evaluator.evaluate(&[run_config(1, 3, 5.0)]).unwrap();
        assert!(condition.must_stop());
        assert_eq!(bus.fired_count(EventKind::AlgorithmRunCompleted), 2);

        bus.shutdown().unwrap();
    }

    #[test]
    fn test_shutdown_bus_fails_batch() {
        let bus = EventManager::new().unwrap();
        bus.shutdown().unwrap();

        let (_backend, inner) = scripted(RunResult::Sat, 1.0);
        let evaluator = NotifyTerminationEvaluator::new(inner, bus, false);

        let result = evaluator.evaluate(&[run_config(1, 1, 5.0)]);
        assert!(matches!(result, Err(EngineError::EventBusShutdown)));
    }

    #[test]
    fn test_async_publishes() {
        let bus = EventManager::new().unwrap();
        let (_backend, inner) = scripted(RunResult::Sat, 1.0);
        let evaluator = NotifyTerminationEvaluator::new(inner, bus.clone(), true);
        let (tx, rx) = crossbeam_channel::bounded(1);

        evaluator.evaluate_runs_async(
            vec![run_config(1, 1, 5.0)],
            Box::new(move |result| tx.send(result.is_ok()).unwrap()),
            None,
        );

        assert!(rx.recv().unwrap());
        assert_eq!(bus.fired_count(EventKind::AlgorithmRunCompleted), 1);
        bus.shutdown().unwrap();
    }
}
