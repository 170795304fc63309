// src/evaluator/tracker.rs
//! Outstanding run and batch accounting

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Counts {
    runs: usize,
    batches: usize,
}

#[derive(Debug, Default)]
struct TrackerState {
    counts: Mutex<Counts>,
    idle: Condvar,
}

/// Counts outstanding batches and wakes waiters when none remain
#[derive(Debug, Clone, Default)]
pub struct OutstandingTracker {
    state: Arc<TrackerState>,
}

impl OutstandingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a batch of `runs` requests; released when the guard drops
    pub fn begin(&self, runs: usize) -> OutstandingGuard {
        let mut counts = self.state.counts.lock();
        counts.runs += runs;
        counts.batches += 1;

        OutstandingGuard {
            state: Arc::clone(&self.state),
            runs,
        }
    }

    pub fn outstanding_runs(&self) -> usize {
        self.state.counts.lock().runs
    }

    pub fn outstanding_batches(&self) -> usize {
        self.state.counts.lock().batches
    }

    /// Block until no batch is outstanding
    pub fn wait_until_idle(&self) {
        let mut counts = self.state.counts.lock();
        while counts.batches > 0 {
            self.state.idle.wait(&mut counts);
        }
    }
}

/// Marks one batch outstanding until dropped
#[derive(Debug)]
pub struct OutstandingGuard {
    state: Arc<TrackerState>,
    runs: usize,
}

impl Drop for OutstandingGuard {
    fn drop(&mut self) {
        let mut counts = self.state.counts.lock();
        counts.runs = counts.runs.saturating_sub(self.runs);
        counts.batches = counts.batches.saturating_sub(1);
        if counts.batches == 0 {
            self.state.idle.notify_all();
        }
    }
}
