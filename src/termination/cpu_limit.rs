// src/termination/cpu_limit.rs
//! Tuner CPU-time budget

use crate::events::{Event, EventKind, EventManager};
use crate::model::{AlgorithmRun, TerminationStatus, TerminationStatusType};
use crate::utils::atomic::AtomicF64;
use crate::termination::TerminationCondition;
use crate::utils::errors::Result;
use std::sync::Arc;

/// Minimum CPU time charged per run
const MIN_RUN_CHARGE: f64 = 0.1;

const NAME: &str = "CPUTIME";

/// CPU seconds consumed by this process so far
pub fn process_cpu_time() -> f64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid, writable timespec for the duration of the call
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_PROCESS_CPUTIME_ID, &mut ts) };
    if rc != 0 {
        return 0.0;
    }
    ts.tv_sec as f64 + ts.tv_nsec as f64 / 1e9
}

/// Trips once the accumulated target algorithm CPU time (plus, optionally,
/// our own CPU time) reaches the limit
pub struct CpuTimeCondition {
    tuner_time_limit: f64,
    run_time: AtomicF64,
    count_own_cpu_time: bool,
}

impl CpuTimeCondition {
    pub fn new(tuner_time_limit: f64, count_own_cpu_time: bool) -> Self {
        Self {
            tuner_time_limit,
            run_time: AtomicF64::new(0.0),
            count_own_cpu_time,
        }
    }

    /// Target algorithm time plus our own CPU time when counted
    pub fn current_tuner_time(&self) -> f64 {
        let own = if self.count_own_cpu_time {
            process_cpu_time()
        } else {
            0.0
        };
        self.run_time.load() + own
    }
}

impl TerminationCondition for CpuTimeCondition {
    fn must_stop(&self) -> bool {
        self.tuner_time_limit <= self.current_tuner_time()
    }

    fn status(&self) -> Vec<TerminationStatus> {
        vec![TerminationStatus::value_max(
            TerminationStatusType::CpuTime,
            self.current_tuner_time(),
            self.tuner_time_limit,
            NAME,
            "Configuration Time Budget",
            "s",
        )]
    }

    fn on_run(&self, run: &AlgorithmRun) {
        self.run_time.fetch_add(run.runtime().max(MIN_RUN_CHARGE));
    }

    fn subscribe_to(self: Arc<Self>, bus: &EventManager) -> Result<()> {
        bus.register_handler(EventKind::AlgorithmRunCompleted, move |event: &Event| -> Result<()> {
            if let Event::AlgorithmRunCompleted { runs } = event {
                for run in runs {
                    self.on_run(run);
                }
            }
            Ok(())
        })
    }

    fn reason(&self) -> String {
        let tuner_time = self.current_tuner_time();
        if self.tuner_time_limit <= tuner_time {
            format!("Tuner Time Limit ({} s) has been reached", tuner_time)
        } else {
            String::new()
        }
    }

    fn tuner_time(&self) -> Option<f64> {
        Some(self.current_tuner_time())
    }
}
