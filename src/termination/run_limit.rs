// src/termination/run_limit.rs
//! Algorithm run budget

use crate::events::{Event, EventKind, EventManager};
use crate::model::{AlgorithmRun, TerminationStatus, TerminationStatusType};
use crate::termination::TerminationCondition;
use crate::utils::errors::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub struct RunLimitCondition {
    run_limit: u64,
    runs: AtomicU64,
}

impl RunLimitCondition {
    pub fn new(run_limit: u64) -> Self {
        Self {
            run_limit,
            runs: AtomicU64::new(0),
        }
    }

    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Acquire)
    }
}

impl TerminationCondition for RunLimitCondition {
    fn must_stop(&self) -> bool {
        self.runs() >= self.run_limit
    }

    fn status(&self) -> Vec<TerminationStatus> {
        vec![TerminationStatus::value_max(
            TerminationStatusType::NumberOfRuns,
            self.runs() as f64,
            self.run_limit as f64,
            "NUMBER OF RUNS",
            "Algorithm Runs",
            "",
        )]
    }

    fn on_run(&self, _run: &AlgorithmRun) {
        self.runs.fetch_add(1, Ordering::AcqRel);
    }

    fn subscribe_to(self: Arc<Self>, bus: &EventManager) -> Result<()> {
        bus.register_handler(EventKind::AlgorithmRunCompleted, move |event: &Event| -> Result<()> {
            if let Event::AlgorithmRunCompleted { runs } = event {
                for run in runs {
                    self.on_run(run);
                }
            }
            Ok(())
        })
    }

    fn reason(&self) -> String {
        if self.must_stop() {
            format!("Algorithm Run Limit ({} runs) has been reached", self.runs())
        } else {
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::algorithm_run::test_support::*;
    use crate::model::RunResult;

    #[test]
    fn test_trips_after_three_completion_events() {
        let bus = EventManager::new().unwrap();
        let condition = Arc::new(RunLimitCondition::new(3));
        Arc::clone(&condition).subscribe_to(&bus).unwrap();

        let rc = run_config(1, 1, 10.0);
        for _ in 0..2 {
            bus.fire(Event::completed_runs(vec![run(&rc, RunResult::Sat, 1.0)])).unwrap();
        }
        bus.flush().unwrap();
        assert!(!condition.must_stop());

        bus.fire(Event::completed_runs(vec![run(&rc, RunResult::Sat, 1.0)])).unwrap();
        bus.flush().unwrap();
        assert!(condition.must_stop());
        assert_eq!(condition.reason(), "Algorithm Run Limit (3 runs) has been reached");

        bus.shutdown().unwrap();
    }
}
