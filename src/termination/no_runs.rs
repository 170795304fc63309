// src/termination/no_runs.rs
//! Stalled-search detection
//!
//! When the parameter space is too small, challengers stop producing new
//! runs. Each challenge start increments a counter, and each completed run
//! batch resets it.

use crate::events::{Event, EventKind, EventManager};
use crate::model::TerminationStatus;
use crate::termination::TerminationCondition;
use crate::utils::errors::Result;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Default number of challenges without a run before giving up
pub const DEFAULT_CHALLENGE_LIMIT: u64 = 1000;

pub struct NoRunsForManyChallengesCondition {
    limit: u64,
    challenges_since_last_run: AtomicU64,
    tripped: AtomicBool,
}

impl NoRunsForManyChallengesCondition {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            challenges_since_last_run: AtomicU64::new(0),
            tripped: AtomicBool::new(false),
        }
    }

    pub fn record_challenge(&self) {
        let count = self.challenges_since_last_run.fetch_add(1, Ordering::AcqRel) + 1;
        if count >= self.limit {
            self.tripped.store(true, Ordering::Release);
        }
    }

    pub fn record_completed_runs(&self) {
        self.challenges_since_last_run.store(0, Ordering::Release);
    }

    pub fn challenges_since_last_run(&self) -> u64 {
        self.challenges_since_last_run.load(Ordering::Acquire)
    }
}

impl Default for NoRunsForManyChallengesCondition {
    fn default() -> Self {
        Self::new(DEFAULT_CHALLENGE_LIMIT)
    }
}

impl TerminationCondition for NoRunsForManyChallengesCondition {
    fn must_stop(&self) -> bool {
        if self.tripped.load(Ordering::Acquire) {
            return true;
        }
        if self.challenges_since_last_run() >= self.limit {
            self.tripped.store(true, Ordering::Release);
            return true;
        }
        false
    }

    fn status(&self) -> Vec<TerminationStatus> {
        Vec::new()
    }

    fn subscribe_to(self: Arc<Self>, bus: &EventManager) -> Result<()> {
        let on_challenge = Arc::clone(&self);
        bus.register_handler(EventKind::ChallengeStart, move |_event: &Event| -> Result<()> {
            on_challenge.record_challenge();
            Ok(())
        })?;

        bus.register_handler(EventKind::AlgorithmRunCompleted, move |_event: &Event| -> Result<()> {
            self.record_completed_runs();
            Ok(())
        })
    }

    fn reason(&self) -> String {
        if self.must_stop() {
            format!(
                "Too many challenges have been attempted without a successful run ({}) has been reached",
                self.limit
            )
        } else {
            String::new()
        }
    }
}
