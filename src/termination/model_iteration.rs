// src/termination/model_iteration.rs
//! Model-build iteration budget

use crate::events::{Event, EventKind, EventManager};
use crate::model::{TerminationStatus, TerminationStatusType};
use crate::termination::TerminationCondition;
use crate::utils::errors::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub struct ModelIterationCondition {
    model_build_limit: u64,
    iterations: AtomicU64,
}

impl ModelIterationCondition {
    pub fn new(model_build_limit: u64) -> Self {
        Self {
            model_build_limit,
            iterations: AtomicU64::new(0),
        }
    }

    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Acquire)
    }

    /// Count one completed model build
    pub fn record_model_build(&self) {
        self.iterations.fetch_add(1, Ordering::AcqRel);
    }
}

impl TerminationCondition for ModelIterationCondition {
    fn must_stop(&self) -> bool {
        self.iterations() >= self.model_build_limit
    }

    fn status(&self) -> Vec<TerminationStatus> {
        vec![TerminationStatus::value_max(
            TerminationStatusType::Other,
            self.iterations() as f64,
            self.model_build_limit as f64,
            "NUMBER OF RUNS",
            "Model/Iteration",
            "",
        )]
    }

    fn subscribe_to(self: Arc<Self>, bus: &EventManager) -> Result<()> {
        bus.register_handler(EventKind::ModelBuildEnd, move |_event: &Event| -> Result<()> {
            self.record_model_build();
            Ok(())
        })
    }

    fn reason(&self) -> String {
        if self.must_stop() {
            format!(
                "Model Building / Iteration Limit ({}) has been reached",
                self.iterations()
            )
        } else {
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_model_build_end_events() {
        let bus = EventManager::new().unwrap();
        let condition = Arc::new(ModelIterationCondition::new(2));
        Arc::clone(&condition).subscribe_to(&bus).unwrap();

        bus.fire(Event::ModelBuildStart).unwrap();
        bus.fire(Event::ModelBuildEnd).unwrap();
        bus.flush().unwrap();
        assert!(!condition.must_stop());

        bus.fire(Event::ModelBuildEnd).unwrap();
        bus.flush().unwrap();
        assert!(condition.must_stop());
        assert_eq!(
            condition.reason(),
            "Model Building / Iteration Limit (2) has been reached"
        );
        assert_eq!(condition.status()[0].status_type, TerminationStatusType::Other);

        bus.shutdown().unwrap();
    }
}
