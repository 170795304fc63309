// src/decorators/consistency.rs
//! Runtime consistency checks
//!
//! Warns when runs overshoot their cutoff, either in reported runtime or in
//! measured wall-clock time. After each warning the threshold moves to the
//! observed overhead plus one second, so a persistently slow target logs a
//! handful of lines instead of one per run.

use crate::decorators::map_callback;
use crate::evaluator::{Evaluator, EvaluatorCallback, SharedObserver};
use crate::model::{AlgorithmRun, RunConfig};
use crate::utils::errors::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

const INITIAL_RUNTIME_DELTA: f64 = 1.0;
const MAX_INITIAL_WALLCLOCK_DELTA: f64 = 10.0;

#[derive(Debug, Clone, Default)]
pub struct TimingTotals {
    pub runtime: f64,
    pub runtime_overhead: f64,
    pub walltime: f64,
    pub walltime_overhead: f64,
    pub walltime_minus_runtime: f64,
}

#[derive(Debug)]
struct CheckerState {
    totals: TimingTotals,
    runtime_delta: f64,
    wallclock_delta: f64,
    warnings: u64,
}

impl CheckerState {
    fn process_run(&mut self, run: &AlgorithmRun) {
        let cutoff = run.run_config().cutoff_time();

        let runtime_overhead = run.runtime() - cutoff;
        self.totals.runtime += run.runtime().max(0.0);
        self.totals.runtime_overhead += runtime_overhead.max(0.0);
        if runtime_overhead > self.runtime_delta {
            self.runtime_delta = runtime_overhead + 1.0;
            self.warnings += 1;
            warn!(
                "Algorithm Run Result reported a runtime of {} (secs) that exceeded it's cutoff time of {} (secs) by {} (secs). Next warning at {} (secs)",
                run.runtime(),
                cutoff,
                runtime_overhead,
                self.runtime_delta
            );
        }

        let wallclock = run.wallclock_execution_time();
        let wallclock_overhead = wallclock - cutoff;
        self.totals.walltime += wallclock.max(0.0);
        self.totals.walltime_overhead += wallclock_overhead.max(0.0);
        if wallclock_overhead > self.wallclock_delta {
            self.wallclock_delta = wallclock_overhead + 1.0;
            self.warnings += 1;
            warn!(
                "Algorithm Run Result reported wallclock time of {} (secs) that exceeded it's cutoff time of {} (secs) by {} (secs). Next warning at {} (secs)",
                wallclock,
                cutoff,
                wallclock_overhead,
                self.wallclock_delta
            );
        }

        self.totals.walltime_minus_runtime += (wallclock - run.runtime()).max(0.0);
    }
}

pub struct RuntimeConsistencyChecker {
    inner: Arc<dyn Evaluator>,
    state: Arc<Mutex<CheckerState>>,
}

impl RuntimeConsistencyChecker {
    /// `cutoff_ceiling` is the scenario's maximum cutoff; it bounds the
    /// initial wall-clock tolerance
    pub fn new(inner: Arc<dyn Evaluator>, cutoff_ceiling: f64) -> Self {
        Self {
            inner,
            state: Arc::new(Mutex::new(CheckerState {
                totals: TimingTotals::default(),
                runtime_delta: INITIAL_RUNTIME_DELTA,
                wallclock_delta: (1.5 * cutoff_ceiling).min(MAX_INITIAL_WALLCLOCK_DELTA),
                warnings: 0,
            })),
        }
    }

    pub fn totals(&self) -> TimingTotals {
        self.state.lock().totals.clone()
    }

    /// Warnings logged so far
    pub fn warning_count(&self) -> u64 {
        self.state.lock().warnings
    }
}

fn check_all(state: &Mutex<CheckerState>, runs: &[AlgorithmRun]) {
    let mut state = state.lock();
    for run in runs {
        state.process_run(run);
    }
}

impl Evaluator for RuntimeConsistencyChecker {
    fn evaluate_runs(
        &self,
        runs: &[RunConfig],
        observer: Option<SharedObserver>,
    ) -> Result<Vec<AlgorithmRun>> {
        let completed = self.inner.evaluate_runs(runs, observer)?;
        check_all(&self.state, &completed);
        Ok(completed)
    }

    fn evaluate_runs_async(
        &self,
        runs: Vec<RunConfig>,
        callback: EvaluatorCallback,
        observer: Option<SharedObserver>,
    ) {
        let state = Arc::clone(&self.state);
        self.inner.evaluate_runs_async(
            runs,
            map_callback(callback, move |completed| {
                check_all(&state, &completed);
                Ok(completed)
            }),
            observer,
        );
    }

    fn notify_shutdown(&self) {
        {
            let state = self.state.lock();
            let totals = &state.totals;
            info!(
                "Total Reported Runtime: {} (s), Total of Sum Max(runtime-cutoff,0): {} (s)",
                totals.runtime, totals.runtime_overhead
            );
            info!(
                "Total Walltime: {} (s), Total of Sum Max(walltime - cutoff, 0): {} (s)",
                totals.walltime, totals.walltime_overhead
            );
            info!(
                "Total Difference between Walltime and Runtime: {} seconds",
                totals.walltime_minus_runtime
            );
        }
        self.inner.notify_shutdown();
    }

    delegate_evaluator!(inner =>
        is_run_final,
        are_runs_persisted,
        are_runs_observable,
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
    use crate::model::algorithm_run::test_support::*;
    use crate::model::RunResult;

    #[test]
    fn test_threshold_grows_after_warning() {
        let (_backend, inner) = scripted(RunResult::Sat, 1.0);
        let checker = RuntimeConsistencyChecker::new(inner, 1.0);
        let rc = run_config(1, 1, 10.0);

        // 3 s over the cutoff trips both thresholds; the next warnings are at 4 s
        check_all(&checker.state, &[run(&rc, RunResult::Sat, 13.0)]);
        assert_eq!(checker.warning_count(), 2);

        check_all(&checker.state, &[run(&rc, RunResult::Sat, 13.5)]);
        assert_eq!(checker.warning_count(), 2);

        check_all(&checker.state, &[run(&rc, RunResult::Sat, 15.0)]);
        assert_eq!(checker.warning_count(), 4);
    }

    #[test]
    fn test_totals_accumulate() {
        let (_backend, inner) = scripted(RunResult::Sat, 4.0);
        let checker = RuntimeConsistencyChecker::new(inner, 10.0);

        checker
            .evaluate(&[run_config(1, 1, 5.0), run_config(1, 2, 5.0)])
            .unwrap();
        let totals = checker.totals();
        assert_eq!(totals.runtime, 8.0);
        assert_eq!(totals.runtime_overhead, 0.0);
        assert_eq!(checker.warning_count(), 0);

        checker.notify_shutdown();
    }
}
