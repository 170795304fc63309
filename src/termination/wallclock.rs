// src/termination/wallclock.rs
//! Wall-clock budget

use crate::model::{TerminationStatus, TerminationStatusType};
use crate::termination::TerminationCondition;
use std::time::{Duration, Instant};

pub struct WallClockCondition {
    start: Instant,
    limit_secs: f64,
}

impl WallClockCondition {
    /// Budget measured from now
    pub fn new(limit_secs: f64) -> Self {
        Self::starting_at(Instant::now(), limit_secs)
    }

    pub fn starting_at(start: Instant, limit_secs: f64) -> Self {
        Self { start, limit_secs }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn limit(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.limit_secs).ok()
    }
}

impl TerminationCondition for WallClockCondition {
    fn must_stop(&self) -> bool {
        match self.limit() {
            Some(limit) => self.start.elapsed() >= limit,
            // Overflowing limits never trip
            None => false,
        }
    }

    fn status(&self) -> Vec<TerminationStatus> {
        vec![TerminationStatus::value_max(
            TerminationStatusType::WallTime,
            self.elapsed_secs(),
            self.limit_secs,
            "WALLCLOCK",
            "Wall-clock Time Budget",
            "s",
        )]
    }

    fn reason(&self) -> String {
        if self.must_stop() {
            format!(
                "Wall-clock Limit ({} s) has been reached",
                self.elapsed_secs()
            )
        } else {
            String::new()
        }
    }

    fn wall_time(&self) -> Option<f64> {
        Some(self.elapsed_secs())
    }

    fn tripped_at(&self) -> Option<Instant> {
        if !self.must_stop() {
            return None;
        }
        self.limit().and_then(|limit| self.start.checked_add(limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trips_after_limit() {
        let start = Instant::now() - Duration::from_secs(5);
        let condition = WallClockCondition::starting_at(start, 2.0);
        assert!(condition.must_stop());
        assert!(condition.reason().starts_with("Wall-clock Limit ("));
        assert_eq!(condition.tripped_at(), Some(start + Duration::from_secs(2)));
    }

    #[test]
    fn test_large_limit_never_trips() {
        let condition = WallClockCondition::new(f64::MAX);
        assert!(!condition.must_stop());
        assert!(condition.reason().is_empty());
        assert!(condition.tripped_at().is_none());
        assert_eq!(condition.status()[0].name, "WALLCLOCK");
    }
}
