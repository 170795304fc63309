// src/model/kill.rs
//! Cancellation of in-flight runs

use crate::model::{AlgorithmRun, ExecutionConfig, RunConfig, RunResult};
use crate::utils::errors::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared kill flag polled by the backend executing a run
#[derive(Debug, Clone, Default)]
pub struct KillHandler {
    killed: Arc<AtomicBool>,
}

impl KillHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kill(&self) {
        self.killed.store(true, Ordering::SeqCst);
    }

    pub fn is_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }
}

/// Progress snapshot of a run handed to observers
#[derive(Debug, Clone)]
pub struct KillableRun {
    run: AlgorithmRun,
    handler: Option<KillHandler>,
}

impl KillableRun {
    /// Snapshot of a run still executing
    #[allow(clippy::too_many_arguments)]
    pub fn running(
        execution_config: Arc<ExecutionConfig>,
        run_config: RunConfig,
        runtime: f64,
        run_length: f64,
        quality: f64,
        result_seed: i64,
        wallclock_time: f64,
        handler: KillHandler,
    ) -> Result<Self> {
        let run = AlgorithmRun::build(
            execution_config,
            run_config,
            RunResult::Running,
            runtime,
            run_length,
            quality,
            result_seed,
            wallclock_time,
            true,
        )?;

        Ok(Self {
            run,
            handler: Some(handler),
        })
    }

    /// Wrap a finished run; `kill` is a no-op on it
    pub fn completed(run: AlgorithmRun) -> Self {
        Self { run, handler: None }
    }

    /// Same snapshot with a different runtime, keeping the kill handler
    pub fn with_runtime(&self, runtime: f64) -> Result<Self> {
        Ok(Self {
            run: self.run.rebuild(self.run.run_result(), runtime, self.handler.is_some())?,
            handler: self.handler.clone(),
        })
    }

    pub fn run(&self) -> &AlgorithmRun {
        &self.run
    }

    pub fn is_running(&self) -> bool {
        self.run.run_result() == RunResult::Running
    }

    /// Request termination. Only has an effect while RUNNING.
    pub fn kill(&self) {
        if !self.is_running() {
            return;
        }
        if let Some(handler) = &self.handler {
            handler.kill();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::algorithm_run::test_support::*;

    #[test]
    fn test_kill_running() {
        let rc = run_config(1, 1, 10.0);
        let handler = KillHandler::new();
        let snapshot =
            KillableRun::running(exec_config(), rc, 2.0, 0.0, 0.0, 1, 2.0, handler.clone()).unwrap();

        assert!(snapshot.is_running());
        snapshot.kill();
        assert!(handler.is_killed());
    }

    #[test]
    fn test_with_runtime_keeps_handler() {
        let rc = run_config(1, 1, 10.0);
        let handler = KillHandler::new();
        let snapshot =
            KillableRun::running(exec_config(), rc, 0.0, 0.0, 0.0, 1, 3.0, handler.clone()).unwrap();

        let adjusted = snapshot.with_runtime(2.5).unwrap();
        assert_eq!(adjusted.run().runtime(), 2.5);
        adjusted.kill();
        assert!(handler.is_killed());
    }

    #[test]
    fn test_kill_completed_is_noop() {
        let rc = run_config(1, 1, 10.0);
        let done = KillableRun::completed(run(&rc, RunResult::Sat, 1.0));

        assert!(!done.is_running());
        done.kill();
        assert!(done.run().is_run_completed());
    }
}
