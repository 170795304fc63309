// src/termination/mod.rs
//! Termination-condition engine
//!
//! Independent stopping criteria combined with a logical OR:
//!
//! - **CpuTimeCondition**: tuner CPU budget (run runtimes plus own CPU time)
//! - **WallClockCondition**: elapsed real time since construction
//! - **RunLimitCondition**: number of completed runs
//! - **ModelIterationCondition**: number of completed model builds
//! - **NoRunsForManyChallengesCondition**: stalled search detection
//! - **FileDeletedCondition**: external stop request via file deletion
//! - **ConfigurationSpaceExhaustedCondition**: every configuration was run
//! - **CompositeTerminationCondition**: the OR of all of the above
//!
//! Every condition is ACTIVE until it trips, and TRIPPED is terminal. Counters
//! are lock-free atomics updated on whichever thread delivers the run or
//! event; there is no dedicated termination thread.
//!
//! ```text
//! EventManager ──AlgorithmRunCompleted──> CPU / runs / stalled
//!              ──ModelBuildEnd─────────> model iterations
//!              ──ChallengeStart────────> stalled
//!                                          │
//!                             Composite.must_stop() <── orchestration loop
//! ```

pub mod composite;
pub mod config_space;
pub mod cpu_limit;
pub mod criteria;
pub mod file_deleted;
pub mod model_iteration;
pub mod no_runs;
pub mod null;
pub mod run_limit;
pub mod wallclock;

use crate::events::EventManager;
use crate::model::{AlgorithmRun, TerminationStatus};
use crate::utils::errors::Result;
use std::sync::Arc;
use std::time::Instant;

pub use composite::CompositeTerminationCondition;
pub use config_space::ConfigurationSpaceExhaustedCondition;
pub use cpu_limit::{process_cpu_time, CpuTimeCondition};
pub use criteria::TerminationCriteria;
pub use file_deleted::FileDeletedCondition;
pub use model_iteration::ModelIterationCondition;
pub use no_runs::NoRunsForManyChallengesCondition;
pub use null::NullTerminationCondition;
pub use run_limit::RunLimitCondition;
pub use wallclock::WallClockCondition;

/// A stopping criterion
pub trait TerminationCondition: Send + Sync {
    /// Whether the search has to stop now
    fn must_stop(&self) -> bool;

    /// Progress snapshots for reporting
    fn status(&self) -> Vec<TerminationStatus>;

    /// Record one completed run. Conditions that count runs also do so when
    /// subscribed to the event bus, so callers use one path or the other.
    fn on_run(&self, _run: &AlgorithmRun) {}

    /// Register the handlers this condition needs on `bus`
    fn subscribe_to(self: Arc<Self>, _bus: &EventManager) -> Result<()> {
        Ok(())
    }

    /// Why the condition tripped; empty while active
    fn reason(&self) -> String;

    /// Tuner CPU time, for conditions that track it
    fn tuner_time(&self) -> Option<f64> {
        None
    }

    /// Elapsed wall-clock seconds, for conditions that track it
    fn wall_time(&self) -> Option<f64> {
        None
    }

    /// When the condition tripped, for conditions that know it without
    /// being polled at that moment
    fn tripped_at(&self) -> Option<Instant> {
        None
    }
}
