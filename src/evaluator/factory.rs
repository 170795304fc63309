// src/evaluator/factory.rs
//! Evaluator chain assembly
//!
//! Builds the configured backend and wraps it, innermost first, in the
//! decorators the options enable. The resulting order, outermost first:
//!
//! ```text
//! UncleanShutdown > Outstanding > NotifyTermination > NonBlocking > Bounded
//!   > LeakingMemory > LogEvery > DuplicateGuard > KillCaptime > Walltime
//!   > TimingInvariant > ConsistencyChecker > AbortOnCrash > Retry > backend
//! ```

use crate::backends::{
    BlackHoleEvaluator, BlackHoleOptions, CommandLineBackend, CommandLineOptions, ConstantBackend,
    ConstantOptions, IpcBackend, IpcOptions, PreloadedBackend, PreloadedOptions, RandomBackend,
    RandomOptions,
};
use crate::decorators::{
    AbortOnCrashEvaluator, AbortOnFirstRunCrashEvaluator, BoundedEvaluator,
    DuplicateGuardEvaluator, KillCaptimeExceedingEvaluator, LeakingMemoryEvaluator,
    LogEveryEvaluator, NonBlockingAsyncEvaluator, NotifyTerminationEvaluator,
    OutstandingEvaluationsEvaluator, RetryCrashedRunsEvaluator, RuntimeConsistencyChecker,
    TimingInvariantEvaluator, UncleanShutdownDetector, WalltimeAsRuntimeEvaluator,
};
use crate::evaluator::{Evaluator, SyncEvaluatorAdapter};
use crate::events::EventManager;
use crate::model::ExecutionConfig;
use crate::utils::errors::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Backend at the bottom of the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Cli,
    Ipc,
    Constant,
    Random,
    Blackhole,
    Preloaded,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Cli => "cli",
            BackendKind::Ipc => "ipc",
            BackendKind::Constant => "constant",
            BackendKind::Random => "random",
            BackendKind::Blackhole => "blackhole",
            BackendKind::Preloaded => "preloaded",
        };
        write!(f, "{}", name)
    }
}

/// Backend selection, per-backend options and decorator switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorOptions {
    pub backend: BackendKind,
    pub cli: CommandLineOptions,
    pub ipc: IpcOptions,
    pub constant: ConstantOptions,
    pub random: RandomOptions,
    pub blackhole: BlackHoleOptions,
    pub preloaded: PreloadedOptions,

    /// Bound on concurrently outstanding runs
    pub max_concurrent_runs: Option<usize>,

    pub check_for_duplicates: bool,

    /// Log duplicates instead of failing the batch
    pub duplicate_warn_only: bool,

    pub log_every: bool,
    pub log_run_config_only: bool,
    pub check_timing_invariants: bool,
    pub walltime_as_runtime: bool,
    pub non_blocking_async: bool,
    pub abort_on_crash: bool,
    pub abort_on_first_run_crash: bool,
    pub retry_crashed_count: u32,

    /// Kill RUNNING runs once runtime exceeds this multiple of the cutoff
    pub kill_captime_exceeding_factor: Option<f64>,

    pub leak_memory_per_run: usize,
    pub check_unclean_shutdown: bool,
    pub check_runtime_consistency: bool,

    /// Flush the event bus after every completed batch
    pub flush_termination_events: bool,
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            cli: CommandLineOptions::default(),
            ipc: IpcOptions::default(),
            constant: ConstantOptions::default(),
            random: RandomOptions::default(),
            blackhole: BlackHoleOptions::default(),
            preloaded: PreloadedOptions::default(),
            max_concurrent_runs: None,
            check_for_duplicates: true,
            duplicate_warn_only: false,
            log_every: false,
            log_run_config_only: false,
            check_timing_invariants: true,
            walltime_as_runtime: false,
            non_blocking_async: false,
            abort_on_crash: false,
            abort_on_first_run_crash: true,
            retry_crashed_count: 0,
            kill_captime_exceeding_factor: None,
            leak_memory_per_run: 0,
            check_unclean_shutdown: true,
            check_runtime_consistency: true,
            flush_termination_events: true,
        }
    }
}

impl EvaluatorOptions {
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_runs == Some(0) {
            return Err(EngineError::Parameter(
                "max_concurrent_runs must be at least 1".to_string(),
            ));
        }
        if let Some(factor) = self.kill_captime_exceeding_factor {
            if factor.is_nan() || factor <= 1.0 {
                return Err(EngineError::Parameter(format!(
                    "kill_captime_exceeding_factor must be greater than 1, got {}",
                    factor
                )));
            }
        }
        match self.backend {
            BackendKind::Cli => self.cli.validate(),
            BackendKind::Ipc => self.ipc.validate(),
            _ => Ok(()),
        }
    }
}

fn build_backend(options: &EvaluatorOptions, exec: &Arc<ExecutionConfig>) -> Result<Arc<dyn Evaluator>> {
    let exec = Arc::clone(exec);
    let backend: Arc<dyn Evaluator> = match options.backend {
        BackendKind::Cli => Arc::new(SyncEvaluatorAdapter::new(CommandLineBackend::new(
            exec,
            options.cli.clone(),
        )?)),
        BackendKind::Ipc => Arc::new(SyncEvaluatorAdapter::new(IpcBackend::new(
            exec,
            options.ipc.clone(),
        )?)),
        BackendKind::Constant => Arc::new(SyncEvaluatorAdapter::new(ConstantBackend::new(
            exec,
            options.constant.clone(),
        ))),
        BackendKind::Random => Arc::new(SyncEvaluatorAdapter::new(RandomBackend::new(
            exec,
            options.random.clone(),
        )?)),
        BackendKind::Blackhole => Arc::new(BlackHoleEvaluator::new(options.blackhole.clone())),
        BackendKind::Preloaded => Arc::new(SyncEvaluatorAdapter::new(PreloadedBackend::new(
            exec,
            options.preloaded.clone(),
        )?)),
    };
    Ok(backend)
}

/// Build the configured backend wrapped in its decorator chain
pub fn build_evaluator(
    options: &EvaluatorOptions,
    exec: Arc<ExecutionConfig>,
    bus: Option<EventManager>,
) -> Result<Arc<dyn Evaluator>> {
    options.validate()?;
    info!("Building {} evaluator for {}", options.backend, exec);

    let mut evaluator = build_backend(options, &exec)?;

    if options.retry_crashed_count > 0 {
        if !exec.is_deterministic() {
            warn!(
                "Crashed runs will be retried up to {} times on a non-deterministic target, retried runs may report different results",
                options.retry_crashed_count
            );
        }
        evaluator = Arc::new(RetryCrashedRunsEvaluator::new(evaluator, options.retry_crashed_count));
    }

    if options.abort_on_crash {
        evaluator = Arc::new(AbortOnCrashEvaluator::new(evaluator));
    } else if options.abort_on_first_run_crash {
        evaluator = Arc::new(AbortOnFirstRunCrashEvaluator::new(evaluator));
    }

    if options.check_runtime_consistency {
        evaluator = Arc::new(RuntimeConsistencyChecker::new(evaluator, exec.algorithm_cutoff_time()));
    }

    if options.check_timing_invariants {
        evaluator = Arc::new(TimingInvariantEvaluator::new(evaluator));
    }

    if options.walltime_as_runtime {
        evaluator = Arc::new(WalltimeAsRuntimeEvaluator::new(evaluator));
    }

    if let Some(factor) = options.kill_captime_exceeding_factor {
        evaluator = Arc::new(KillCaptimeExceedingEvaluator::new(evaluator, factor)?);
    }

    if options.check_for_duplicates {
        evaluator = Arc::new(DuplicateGuardEvaluator::new(evaluator, !options.duplicate_warn_only));
    }

    if options.log_every {
        evaluator = Arc::new(LogEveryEvaluator::new(evaluator, options.log_run_config_only));
    }

    if options.leak_memory_per_run > 0 {
        evaluator = Arc::new(LeakingMemoryEvaluator::new(evaluator, options.leak_memory_per_run));
    }

    if let Some(bound) = options.max_concurrent_runs {
        evaluator = Arc::new(BoundedEvaluator::new(evaluator, bound)?);
    }

    if options.non_blocking_async {
        evaluator = Arc::new(NonBlockingAsyncEvaluator::new(evaluator)?);
    }

    if let Some(bus) = bus {
        evaluator = Arc::new(NotifyTerminationEvaluator::new(
            evaluator,
            bus,
            options.flush_termination_events,
        ));
    }

    evaluator = Arc::new(OutstandingEvaluationsEvaluator::new(evaluator));

    if options.check_unclean_shutdown {
        evaluator = Arc::new(UncleanShutdownDetector::new(
            evaluator,
            format!("{} evaluator chain", options.backend),
        ));
    }

    debug!("Evaluator chain built");
    Ok(evaluator)
}
