// src/decorators/walltime.rs
//! Wall-clock time as runtime
//!
//! Some backends report zero runtime for runs they had to kill, or while a
//! run is still in flight. For those runs the measured wall-clock time,
//! scaled down, stands in for the runtime. Both completed outcomes and
//! observer snapshots are rewritten.

use crate::decorators::map_callback;
use crate::evaluator::{Evaluator, EvaluatorCallback, RunObserver, SharedObserver};
use crate::model::{AlgorithmRun, KillableRun, RunConfig, RunResult};
use crate::utils::errors::{EngineError, Result};
use std::sync::Arc;
use tracing::warn;

pub const DEFAULT_SCALE_FACTOR: f64 = 0.95;
pub const DEFAULT_START_AT: f64 = 0.05;

#[derive(Debug, Clone, Copy)]
struct WalltimeRule {
    scale_factor: f64,
    start_at: f64,
}

impl WalltimeRule {
    fn applies(&self, run: &AlgorithmRun, result: RunResult) -> bool {
        run.run_result() == result
            && run.runtime() == 0.0
            && run.wallclock_execution_time() > self.start_at
    }

    fn runtime_for(&self, run: &AlgorithmRun) -> f64 {
        (run.wallclock_execution_time() * self.scale_factor).max(0.0)
    }

    fn process_run(&self, run: AlgorithmRun) -> Result<AlgorithmRun> {
        if self.applies(&run, RunResult::Killed) {
            run.with_runtime(self.runtime_for(&run))
        } else {
            Ok(run)
        }
    }

    fn process_runs(&self, runs: Vec<AlgorithmRun>) -> Result<Vec<AlgorithmRun>> {
        runs.into_iter().map(|run| self.process_run(run)).collect()
    }
}

struct WalltimeObserver {
    rule: WalltimeRule,
    inner: SharedObserver,
}

impl RunObserver for WalltimeObserver {
    fn current_status(&self, runs: &[KillableRun]) {
        let adjusted: Vec<KillableRun> = runs
            .iter()
            .map(|snapshot| {
                if !self.rule.applies(snapshot.run(), RunResult::Running) {
                    return snapshot.clone();
                }
                snapshot
                    .with_runtime(self.rule.runtime_for(snapshot.run()))
                    .unwrap_or_else(|e| {
                        warn!("Could not adjust runtime of {}: {}", snapshot.run(), e);
                        snapshot.clone()
                    })
            })
            .collect();

        self.inner.current_status(&adjusted);
    }
}

pub struct WalltimeAsRuntimeEvaluator {
    inner: Arc<dyn Evaluator>,
    rule: WalltimeRule,
}

impl WalltimeAsRuntimeEvaluator {
    pub fn new(inner: Arc<dyn Evaluator>) -> Self {
        Self {
            inner,
            rule: WalltimeRule {
                scale_factor: DEFAULT_SCALE_FACTOR,
                start_at: DEFAULT_START_AT,
            },
        }
    }

    pub fn with_scaling(inner: Arc<dyn Evaluator>, scale_factor: f64, start_at: f64) -> Result<Self> {
        if scale_factor.is_nan() || scale_factor <= 0.0 || start_at.is_nan() || start_at < 0.0 {
            return Err(EngineError::Parameter(format!(
                "Wall-clock scale factor must be positive and start time non-negative, got {} and {}",
                scale_factor, start_at
            )));
        }

        Ok(Self {
            inner,
            rule: WalltimeRule {
                scale_factor,
                start_at,
            },
        })
    }

    fn wrap(&self, observer: Option<SharedObserver>) -> Option<SharedObserver> {
        observer.map(|inner| {
            Arc::new(WalltimeObserver {
                rule: self.rule,
                inner,
            }) as SharedObserver
        })
    }
}

impl Evaluator for WalltimeAsRuntimeEvaluator {
    fn evaluate_runs(
        &self,
        runs: &[RunConfig],
        observer: Option<SharedObserver>,
    ) -> Result<Vec<AlgorithmRun>> {
        let completed = self.inner.evaluate_runs(runs, self.wrap(observer))?;
        self.rule.process_runs(completed)
    }

    fn evaluate_runs_async(
        &self,
        runs: Vec<RunConfig>,
        callback: EvaluatorCallback,
        observer: Option<SharedObserver>,
    ) {
        let rule = self.rule;
        self.inner.evaluate_runs_async(
            runs,
            map_callback(callback, move |completed| rule.process_runs(completed)),
            self.wrap(observer),
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
    use crate::model::algorithm_run::test_support::*;
    use crate::model::KillHandler;
    use parking_lot::Mutex;

    fn killed(wallclock: f64) -> AlgorithmRun {
        let rc = run_config(1, 1, 10.0);
        AlgorithmRun::new(exec_config(), rc, RunResult::Killed, 0.0, 0.0, 0.0, 1, wallclock).unwrap()
    }

    fn rule() -> WalltimeRule {
        WalltimeRule {
            scale_factor: DEFAULT_SCALE_FACTOR,
            start_at: DEFAULT_START_AT,
        }
    }

    #[test]
    fn test_killed_run_uses_walltime() {
        let adjusted = rule().process_run(killed(4.0)).unwrap();
        assert!((adjusted.runtime() - 3.8).abs() < 1e-9);
        assert_eq!(adjusted.run_result(), RunResult::Killed);
    }

    #[test]
    fn test_short_or_measured_runs_untouched() {
        let short = rule().process_run(killed(0.01)).unwrap();
        assert_eq!(short.runtime(), 0.0);

        let rc = run_config(1, 1, 10.0);
        let sat = run(&rc, RunResult::Sat, 2.0);
        assert_eq!(rule().process_run(sat).unwrap().runtime(), 2.0);
    }

    #[test]
    fn test_observer_sees_adjusted_snapshot() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let inner: SharedObserver = Arc::new(move |runs: &[KillableRun]| {
            sink.lock().extend(runs.iter().map(|r| r.run().runtime()));
        });

        let observer = WalltimeObserver { rule: rule(), inner };
        let snapshot = KillableRun::running(
            exec_config(),
            run_config(1, 1, 10.0),
            0.0,
            0.0,
            0.0,
            1,
            2.0,
            KillHandler::new(),
        )
        .unwrap();

        observer.current_status(&[snapshot]);
        assert!((seen.lock()[0] - 1.9).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_scaling_rejected() {
        let (_backend, inner) = crate::decorators::test_support::scripted(RunResult::Sat, 1.0);
        assert!(WalltimeAsRuntimeEvaluator::with_scaling(inner, 0.0, 0.05).is_err());
    }
}
