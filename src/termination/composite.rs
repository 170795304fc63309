// src/termination/composite.rs
//! Logical OR over a set of termination conditions

use crate::events::{Event, EventKind, EventManager};
use crate::model::{AlgorithmRun, TerminationStatus};
use crate::termination::TerminationCondition;
use crate::utils::errors::Result;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Stops as soon as any sub-condition stops.
///
/// The sub-condition that tripped first is remembered, so `reason` keeps
/// reporting it even after later conditions trip as well. Trips are observed
/// on `must_stop`, `on_run` and, once subscribed, after every event that can
/// move a counter. When several conditions are found tripped in the same
/// scan, the earliest `tripped_at` wins; conditions that cannot tell count as
/// tripping at the moment of the scan.
pub struct CompositeTerminationCondition {
    conditions: Vec<Arc<dyn TerminationCondition>>,
    first_tripped: OnceCell<usize>,
}

impl CompositeTerminationCondition {
    pub fn new(conditions: Vec<Arc<dyn TerminationCondition>>) -> Self {
        Self {
            conditions,
            first_tripped: OnceCell::new(),
        }
    }

    pub fn with_condition(mut self, condition: Arc<dyn TerminationCondition>) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    fn observe(&self) -> Option<usize> {
        if let Some(index) = self.first_tripped.get() {
            return Some(*index);
        }

        let now = Instant::now();
        let (_, index) = self
            .conditions
            .iter()
            .enumerate()
            .filter(|(_, c)| c.must_stop())
            .map(|(index, c)| (c.tripped_at().map_or(now, |at| at.min(now)), index))
            .min()?;
        let first = *self.first_tripped.get_or_init(|| index);
        if first == index {
            info!("Termination condition tripped: {}", self.conditions[index].reason());
        }
        Some(first)
    }
}

impl TerminationCondition for CompositeTerminationCondition {
    fn must_stop(&self) -> bool {
        self.observe().is_some()
    }

    fn status(&self) -> Vec<TerminationStatus> {
        self.conditions.iter().flat_map(|c| c.status()).collect()
    }

    fn on_run(&self, run: &AlgorithmRun) {
        for condition in &self.conditions {
            condition.on_run(run);
        }
        self.observe();
    }

    fn subscribe_to(self: Arc<Self>, bus: &EventManager) -> Result<()> {
        for condition in &self.conditions {
            Arc::clone(condition).subscribe_to(bus)?;
        }

        // Registered after the sub-conditions so it runs after them
        for kind in [
            EventKind::AlgorithmRunCompleted,
            EventKind::ModelBuildEnd,
            EventKind::ChallengeStart,
        ] {
            let composite = Arc::clone(&self);
            bus.register_handler(kind, move |_event: &Event| -> Result<()> {
                composite.observe();
                Ok(())
            })?;
        }
        Ok(())
    }

    fn reason(&self) -> String {
        self.observe()
            .map(|index| self.conditions[index].reason())
            .unwrap_or_default()
    }

    fn tuner_time(&self) -> Option<f64> {
        self.conditions.iter().find_map(|c| c.tuner_time())
    }

    fn wall_time(&self) -> Option<f64> {
        self.conditions.iter().find_map(|c| c.wall_time())
    }

    fn tripped_at(&self) -> Option<Instant> {
        self.conditions.iter().filter_map(|c| c.tripped_at()).min()
    }
}
