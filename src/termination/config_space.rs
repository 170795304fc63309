// src/termination/config_space.rs
//! Trips once every configuration has been run on every instance/seed pair

use crate::model::{AlgorithmRun, TerminationStatus, TerminationStatusType};
use crate::termination::TerminationCondition;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct ConfigurationSpaceExhaustedCondition {
    config_space_size: f64,
    runs_per_configuration: u32,
    runs: AtomicU64,
}

impl ConfigurationSpaceExhaustedCondition {
    /// `config_space_size` is an upper bound supplied by the parameter space
    pub fn new(config_space_size: f64, runs_per_configuration: u32) -> Self {
        Self {
            config_space_size,
            runs_per_configuration,
            runs: AtomicU64::new(0),
        }
    }

    fn run_limit(&self) -> f64 {
        self.config_space_size * self.runs_per_configuration as f64
    }
}

impl TerminationCondition for ConfigurationSpaceExhaustedCondition {
    fn must_stop(&self) -> bool {
        self.run_limit() <= self.runs.load(Ordering::Acquire) as f64
    }

    fn status(&self) -> Vec<TerminationStatus> {
        vec![TerminationStatus::value_max(
            TerminationStatusType::NumberOfRuns,
            self.runs.load(Ordering::Acquire) as f64,
            self.run_limit(),
            "CONFIG_SPACE",
            "Configuration Space Searched",
            "",
        )]
    }

    fn on_run(&self, _run: &AlgorithmRun) {
        self.runs.fetch_add(1, Ordering::AcqRel);
    }

    fn reason(&self) -> String {
        if self.must_stop() {
            format!(
                "Every possible configuration ({}) and problem instance seed pair ({}) has been run",
                self.config_space_size, self.runs_per_configuration
            )
        } else {
            String::new()
        }
    }
}
