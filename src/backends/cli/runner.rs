// src/backends/cli/runner.rs
//! Execution of a single target algorithm process
//!
//! The process is spawned with piped output. stdout is scanned for the
//! result line while a ticker watches the kill flag and the wall-clock
//! limit. Termination is SIGTERM first, SIGKILL once the grace period has
//! passed.

use crate::backends::cli::command::{call_string, command_tokens};
use crate::backends::cli::CommandLineOptions;
use crate::backends::response_parser::{crashed, ResponseParser};
use crate::model::{AlgorithmRun, ExecutionConfig, KillHandler, KillableRun, RunConfig, RunResult};
use crate::utils::errors::{EngineError, Result};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

/// Environment variable telling the wrapper which concurrency slot it has
pub const TASK_ID_ENV: &str = "ACLIB_CONCURRENT_TASK_ID";

/// Lines of output kept for crash reports
const OUTPUT_TAIL_LINES: usize = 1000;

/// Interval for kill flag and wall-clock checks
const WATCH_INTERVAL: Duration = Duration::from_millis(50);

/// Time between SIGTERM and SIGKILL
const KILL_GRACE: Duration = Duration::from_secs(3);

/// Wall-clock allowance before a run is terminated: cutoff × factor + slack
const WALLCLOCK_LIMIT_FACTOR: f64 = 1.5;
const WALLCLOCK_LIMIT_SLACK_SECS: f64 = 10.0;

/// Progress of one run shared with the batch observer
#[derive(Debug)]
pub(crate) struct RunProgress {
    pub(crate) run_config: RunConfig,
    pub(crate) handler: KillHandler,
    started: Mutex<Option<Instant>>,
    finished: Mutex<Option<AlgorithmRun>>,
}

impl RunProgress {
    pub(crate) fn new(run_config: RunConfig) -> Self {
        Self {
            run_config,
            handler: KillHandler::new(),
            started: Mutex::new(None),
            finished: Mutex::new(None),
        }
    }

    pub(crate) fn finish(&self, run: AlgorithmRun) {
        *self.finished.lock() = Some(run);
    }

    /// Current snapshot: completed once finished, RUNNING otherwise
    pub(crate) fn snapshot(&self, exec: &Arc<ExecutionConfig>) -> Result<KillableRun> {
        if let Some(run) = self.finished.lock().clone() {
            return Ok(KillableRun::completed(run));
        }

        let started = *self.started.lock();
        let elapsed = started
            .map(|started| started.elapsed().as_secs_f64())
            .unwrap_or(0.0);

        KillableRun::running(
            Arc::clone(exec),
            self.run_config.clone(),
            elapsed,
            0.0,
            0.0,
            self.run_config.seed(),
            elapsed,
            self.handler.clone(),
        )
    }
}

/// Why the process was signalled, if it was
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Termination {
    None,
    Killed,
    WallclockExceeded,
}

struct Signaller {
    pid: Option<Pid>,
    term_sent: Option<Instant>,
    kill_sent: bool,
}

impl Signaller {
    fn new(pid: Option<u32>) -> Self {
        Self {
            pid: pid.map(|pid| Pid::from_raw(pid as i32)),
            term_sent: None,
            kill_sent: false,
        }
    }

    /// SIGTERM on the first call, SIGKILL once the grace period has passed.
    /// Signals go to the whole process group so wrapper children die too.
    fn escalate(&mut self) {
        let pid = match self.pid {
            Some(pid) => pid,
            None => return,
        };

        match self.term_sent {
            None => {
                debug!("Sending SIGTERM to PID {}", pid);
                if let Err(e) = killpg(pid, Signal::SIGTERM) {
                    debug!("Failed to send SIGTERM to PID {}: {}", pid, e);
                }
                self.term_sent = Some(Instant::now());
            }
            Some(sent) if !self.kill_sent && sent.elapsed() >= KILL_GRACE => {
                if killpg(pid, None).is_ok() {
                    warn!("Process group {} still alive after SIGTERM, sending SIGKILL", pid);
                    if let Err(e) = killpg(pid, Signal::SIGKILL) {
                        error!("Failed to send SIGKILL to PID {}: {}", pid, e);
                    }
                }
                self.kill_sent = true;
            }
            Some(_) => {}
        }
    }
}

/// Everything one process run needs, cloned into its task
#[derive(Clone)]
pub(crate) struct ProcessRunner {
    pub(crate) exec: Arc<ExecutionConfig>,
    pub(crate) parser: ResponseParser,
    pub(crate) options: CommandLineOptions,
}

impl ProcessRunner {
    /// Execute `progress.run_config` in slot `task_id`
    pub(crate) async fn run(&self, progress: &RunProgress, task_id: usize) -> Result<AlgorithmRun> {
        let rc = &progress.run_config;

        if rc.cutoff_time() <= 0.0 || progress.handler.is_killed() {
            debug!("Not running {}, cutoff is zero or it was already killed", rc);
            return AlgorithmRun::new(
                Arc::clone(&self.exec),
                rc.clone(),
                RunResult::Timeout,
                0.0,
                0.0,
                0.0,
                rc.seed(),
                0.0,
            );
        }

        let tokens = command_tokens(&self.exec, rc);
        let (program, args) = match tokens.split_first() {
            Some(split) => split,
            None => {
                return Err(EngineError::abort(format!(
                    "No algorithm executable configured for {}",
                    rc
                )))
            }
        };

        if self.options.log_all_call_strings {
            info!("Call: {}", call_string(&self.exec, rc));
        }

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(self.exec.algorithm_execution_directory())
            .env(TASK_ID_ENV, task_id.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);

        let started = Instant::now();
        let mut child = command.spawn().map_err(|e| {
            EngineError::abort(format!(
                "Failed to start target algorithm ({}): {}",
                call_string(&self.exec, rc),
                e
            ))
        })?;
        *progress.started.lock() = Some(started);
        debug!("Process spawned with PID: {:?}", child.id());

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Internal("stdout of target algorithm not piped".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::Internal("stderr of target algorithm not piped".into()))?;

        let tail = Arc::new(Mutex::new(VecDeque::with_capacity(OUTPUT_TAIL_LINES)));
        let stderr_tail = Arc::clone(&tail);
        let log_output = self.options.log_all_process_output;
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if log_output {
                    debug!("[PROCESS-ERR] {}", line);
                }
                push_tail(&stderr_tail, line);
            }
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut signaller = Signaller::new(child.id());
        let mut ticker = tokio::time::interval(WATCH_INTERVAL);
        let wallclock_limit = rc.cutoff_time() * WALLCLOCK_LIMIT_FACTOR + WALLCLOCK_LIMIT_SLACK_SECS;

        let mut stdout_open = true;
        let mut termination = Termination::None;
        let mut result_line: Option<String> = None;
        let mut duplicate = false;

        let status = loop {
            tokio::select! {
                line = lines.next_line(), if stdout_open => match line {
                    Ok(Some(line)) => {
                        if log_output {
                            debug!("[PROCESS] {}", line);
                        }
                        if self.parser.is_result_line(&line) {
                            if result_line.is_some() {
                                duplicate = true;
                            } else {
                                result_line = Some(line.clone());
                            }
                        }
                        push_tail(&tail, line);
                    }
                    Ok(None) => stdout_open = false,
                    Err(e) => {
                        warn!("Could not read target algorithm output: {}", e);
                        stdout_open = false;
                    }
                },
                status = child.wait(), if !stdout_open => break status,
                _ = ticker.tick() => {
                    if termination == Termination::None {
                        if progress.handler.is_killed() {
                            termination = Termination::Killed;
                        } else if started.elapsed().as_secs_f64() > wallclock_limit {
                            warn!(
                                "Run {} exceeded its wall-clock allowance of {} (secs), terminating",
                                rc, wallclock_limit
                            );
                            termination = Termination::WallclockExceeded;
                        }
                    }
                    if termination != Termination::None {
                        signaller.escalate();
                    }
                }
            }
        };

        let walltime = started.elapsed().as_secs_f64();
        if let Err(e) = stderr_task.await {
            debug!("stderr reader ended abnormally: {}", e);
        }
        match &status {
            Ok(status) => debug!("Process for {} exited with {}", rc, status),
            Err(e) => warn!("Could not collect exit status for {}: {}", rc, e),
        }

        let run = self.outcome(rc, result_line, duplicate, termination, walltime)?;
        if matches!(run.run_result(), RunResult::Crashed | RunResult::Abort) {
            self.log_tail(rc, &tail);
        }
        Ok(run)
    }

    fn outcome(
        &self,
        rc: &RunConfig,
        result_line: Option<String>,
        duplicate: bool,
        termination: Termination,
        walltime: f64,
    ) -> Result<AlgorithmRun> {
        if duplicate {
            error!(
                "Multiple result lines matched for {}, the run is treated as ABORT: duplicate lines matched",
                call_string(&self.exec, rc)
            );
            return self.fixed(rc, RunResult::Abort, 0.0, walltime);
        }

        match (result_line, termination) {
            (Some(line), _) => self.parser.parse(&line, rc, &self.exec, walltime),
            (None, Termination::Killed) => self.fixed(rc, RunResult::Killed, walltime, walltime),
            (None, Termination::WallclockExceeded) => {
                self.fixed(rc, RunResult::Timeout, rc.cutoff_time(), walltime)
            }
            (None, Termination::None) => {
                error!(
                    "Target algorithm exited without a result line: {}",
                    call_string(&self.exec, rc)
                );
                crashed(rc, &self.exec, walltime)
            }
        }
    }

    fn fixed(&self, rc: &RunConfig, result: RunResult, runtime: f64, walltime: f64) -> Result<AlgorithmRun> {
        AlgorithmRun::new(
            Arc::clone(&self.exec),
            rc.clone(),
            result,
            runtime,
            0.0,
            0.0,
            rc.seed(),
            walltime,
        )
    }

    fn log_tail(&self, rc: &RunConfig, tail: &Mutex<VecDeque<String>>) {
        let tail = tail.lock();
        error!(
            "Last {} lines of output for {}:\n{}",
            tail.len(),
            call_string(&self.exec, rc),
            tail.iter().cloned().collect::<Vec<_>>().join("\n")
        );
    }
}

fn push_tail(tail: &Mutex<VecDeque<String>>, line: String) {
    let mut tail = tail.lock();
    if tail.len() == OUTPUT_TAIL_LINES {
        tail.pop_front();
    }
    tail.push_back(line);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_keeps_last_lines() {
        let tail = Mutex::new(VecDeque::new());
        for i in 0..(OUTPUT_TAIL_LINES + 5) {
            push_tail(&tail, i.to_string());
        }

        let tail = tail.lock();
        assert_eq!(tail.len(), OUTPUT_TAIL_LINES);
        assert_eq!(tail.front().map(String::as_str), Some("5"));
    }

    #[test]
    fn test_unstarted_snapshot_is_running() {
        use crate::model::algorithm_run::test_support::*;

        let progress = RunProgress::new(run_config(1, 1, 5.0));
        let snapshot = progress.snapshot(&exec_config()).unwrap();
        assert!(snapshot.is_running());
        assert_eq!(snapshot.run().runtime(), 0.0);

        progress.finish(run(&progress.run_config, RunResult::Sat, 1.0));
        assert!(!progress.snapshot(&exec_config()).unwrap().is_running());
    }

    #[test]
    fn test_snapshot_kill_reaches_handler() {
        use crate::model::algorithm_run::test_support::*;

        let progress = RunProgress::new(run_config(1, 1, 5.0));
        progress.snapshot(&exec_config()).unwrap().kill();
        assert!(progress.handler.is_killed());
    }
}
