// src/backends/cli/mod.rs
//! Command line backend
//!
//! Runs the target algorithm as one child process per run on a dedicated
//! tokio runtime. Up to `cores` runs execute at once; each holds a
//! concurrency slot whose number is exported to the wrapper in
//! `ACLIB_CONCURRENT_TASK_ID`.
//!
//! ```text
//! execute(batch) ──block_on──> [run 0] [run 1] ... (≤ cores at once)
//!                         └──> observer ticker every observer_frequency_ms
//! ```

pub mod command;
pub mod runner;

use crate::backends::response_parser::ResponseParser;
use crate::evaluator::{RunExecutor, SharedObserver};
use crate::model::{AlgorithmRun, ExecutionConfig, KillableRun, RunConfig};
use crate::utils::errors::{EngineError, Result};
use parking_lot::Mutex;
use runner::{ProcessRunner, RunProgress};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

pub use runner::TASK_ID_ENV;

/// Smallest permitted observer interval
pub const MIN_OBSERVER_FREQUENCY_MS: u64 = 50;

/// Options for the command line backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandLineOptions {
    /// Runs executed concurrently
    pub cores: usize,

    /// Interval between observer notifications
    pub observer_frequency_ms: u64,

    /// Log every call string at info level
    pub log_all_call_strings: bool,

    /// Log every line the target algorithm prints at debug level
    pub log_all_process_output: bool,
}

impl Default for CommandLineOptions {
    fn default() -> Self {
        Self {
            cores: 1,
            observer_frequency_ms: 750,
            log_all_call_strings: false,
            log_all_process_output: false,
        }
    }
}

impl CommandLineOptions {
    pub fn validate(&self) -> Result<()> {
        if self.cores == 0 {
            return Err(EngineError::Parameter(
                "Number of cores must be at least 1".to_string(),
            ));
        }
        if self.observer_frequency_ms < MIN_OBSERVER_FREQUENCY_MS {
            return Err(EngineError::Parameter(format!(
                "Observer frequency must be at least {} ms, got {}",
                MIN_OBSERVER_FREQUENCY_MS, self.observer_frequency_ms
            )));
        }
        Ok(())
    }
}

/// One process per run, executed on a private runtime
pub struct CommandLineBackend {
    runner: ProcessRunner,
    runtime: Runtime,
    slots: Arc<Semaphore>,
    task_ids: Arc<Mutex<Vec<usize>>>,
}

impl CommandLineBackend {
    pub fn new(exec: Arc<ExecutionConfig>, options: CommandLineOptions) -> Result<Self> {
        options.validate()?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(options.cores.clamp(1, 16))
            .thread_name("CLI Target Algorithm Runner")
            .enable_all()
            .build()?;

        info!(
            "Command line backend ready: {} core(s), observer every {} ms",
            options.cores, options.observer_frequency_ms
        );

        Ok(Self {
            slots: Arc::new(Semaphore::new(options.cores)),
            task_ids: Arc::new(Mutex::new((0..options.cores).rev().collect())),
            runner: ProcessRunner {
                exec,
                parser: ResponseParser::new()?,
                options,
            },
            runtime,
        })
    }

    async fn execute_batch(
        &self,
        runs: &[RunConfig],
        observer: Option<SharedObserver>,
    ) -> Result<Vec<AlgorithmRun>> {
        let progress: Vec<Arc<RunProgress>> = runs
            .iter()
            .cloned()
            .map(|rc| Arc::new(RunProgress::new(rc)))
            .collect();

        let observing = observer.clone().map(|observer| {
            tokio::spawn(observe(
                Arc::clone(&self.runner.exec),
                progress.clone(),
                observer,
                Duration::from_millis(self.runner.options.observer_frequency_ms),
            ))
        });

        let mut tasks = JoinSet::new();
        for (index, run_progress) in progress.iter().enumerate() {
            let runner = self.runner.clone();
            let slots = Arc::clone(&self.slots);
            let task_ids = Arc::clone(&self.task_ids);
            let run_progress = Arc::clone(run_progress);

            tasks.spawn(async move {
                let _slot = slots
                    .acquire_owned()
                    .await
                    .map_err(|_| EngineError::EvaluatorShutdown("CLI backend slots closed".into()))?;
                let task_id = task_ids.lock().pop().unwrap_or(index);

                let outcome = runner.run(&run_progress, task_id).await;
                task_ids.lock().push(task_id);

                let run = outcome?;
                run_progress.finish(run.clone());
                Ok::<_, EngineError>((index, run))
            });
        }

        let mut completed: Vec<Option<AlgorithmRun>> = vec![None; runs.len()];
        let mut failure: Option<EngineError> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok((index, run))) => completed[index] = Some(run),
                Ok(Err(e)) => {
                    error!("Run failed: {}", e);
                    failure.get_or_insert(e);
                }
                Err(e) => {
                    error!("Run task ended abnormally: {}", e);
                    failure.get_or_insert(EngineError::Internal(format!("run task failed: {}", e)));
                }
            }
        }

        if let Some(task) = observing {
            task.abort();
        }

        let known: Vec<AlgorithmRun> = completed.iter().flatten().cloned().collect();
        if let Some(e) = failure {
            let message = match e {
                EngineError::Abort { message, .. } => message,
                other => other.to_string(),
            };
            return Err(EngineError::Abort {
                message,
                runs: known,
            });
        }

        if let Some(observer) = observer {
            let snapshots: Vec<KillableRun> = known.iter().cloned().map(KillableRun::completed).collect();
            observer.current_status(&snapshots);
        }
        Ok(known)
    }
}

/// Hand RUNNING snapshots of the batch to `observer` until aborted
async fn observe(
    exec: Arc<ExecutionConfig>,
    progress: Vec<Arc<RunProgress>>,
    observer: SharedObserver,
    frequency: Duration,
) {
    let mut ticker = tokio::time::interval(frequency);
    loop {
        ticker.tick().await;

        let snapshots: Result<Vec<KillableRun>> = progress.iter().map(|p| p.snapshot(&exec)).collect();
        match snapshots {
            Ok(snapshots) => observer.current_status(&snapshots),
            Err(e) => debug!("Skipping observer notification: {}", e),
        }
    }
}

impl RunExecutor for CommandLineBackend {
    fn name(&self) -> &'static str {
        "Command Line"
    }

    fn execute(
        &self,
        runs: &[RunConfig],
        observer: Option<&SharedObserver>,
    ) -> Result<Vec<AlgorithmRun>> {
        self.runtime
            .block_on(self.execute_batch(runs, observer.cloned()))
    }

    fn are_runs_observable(&self) -> bool {
        true
    }

    fn shutdown(&self) {
        self.slots.close();
        debug!("Command line backend closed to new runs");
    }
}
