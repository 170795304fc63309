// src/events/event.rs
//! Domain events

use crate::model::{AlgorithmRun, ParamConfiguration};
use std::fmt;

/// Payload-free tag of an [`Event`], used as the registration key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    AlgorithmRunCompleted,
    ModelBuildStart,
    ModelBuildEnd,
    ChallengeStart,
    ChallengeEnd,
    IncumbentPerformanceChange,
    AutomaticConfigurationEnd,
    StateRestored,
    LogRuntimeStatistics,
    HandlerError,
    Shutdown,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::AlgorithmRunCompleted => "AlgorithmRunCompletedEvent",
            EventKind::ModelBuildStart => "ModelBuildStartEvent",
            EventKind::ModelBuildEnd => "ModelBuildEndEvent",
            EventKind::ChallengeStart => "ChallengeStartEvent",
            EventKind::ChallengeEnd => "ChallengeEndEvent",
            EventKind::IncumbentPerformanceChange => "IncumbentPerformanceChangeEvent",
            EventKind::AutomaticConfigurationEnd => "AutomaticConfigurationEnd",
            EventKind::StateRestored => "StateRestoredEvent",
            EventKind::LogRuntimeStatistics => "LogRuntimeStatisticEvent",
            EventKind::HandlerError => "EventHandlerRuntimeExceptionEvent",
            EventKind::Shutdown => "EventManagerShutdownEvent",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Events dispatched by the [`EventManager`](crate::events::EventManager)
#[derive(Debug, Clone)]
pub enum Event {
    /// A batch of runs finished
    AlgorithmRunCompleted { runs: Vec<AlgorithmRun> },

    ModelBuildStart,

    ModelBuildEnd,

    /// A challenger is about to be raced against the incumbent
    ChallengeStart { challenger: ParamConfiguration },

    ChallengeEnd {
        challenger: ParamConfiguration,
        new_incumbent: bool,
        runs_performed: usize,
    },

    IncumbentPerformanceChange {
        incumbent: ParamConfiguration,
        empirical_performance: f64,
        tuner_time: f64,
        wallclock_time: f64,
    },

    AutomaticConfigurationEnd {
        incumbent: ParamConfiguration,
        empirical_performance: f64,
    },

    /// Search state was restored from an external snapshot
    StateRestored { iteration: u64, runs_restored: usize },

    LogRuntimeStatistics { iteration: u64, summary: String },

    /// A handler failed while processing `source`
    HandlerError { source: EventKind, message: String },

    Shutdown,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::AlgorithmRunCompleted { .. } => EventKind::AlgorithmRunCompleted,
            Event::ModelBuildStart => EventKind::ModelBuildStart,
            Event::ModelBuildEnd => EventKind::ModelBuildEnd,
            Event::ChallengeStart { .. } => EventKind::ChallengeStart,
            Event::ChallengeEnd { .. } => EventKind::ChallengeEnd,
            Event::IncumbentPerformanceChange { .. } => EventKind::IncumbentPerformanceChange,
            Event::AutomaticConfigurationEnd { .. } => EventKind::AutomaticConfigurationEnd,
            Event::StateRestored { .. } => EventKind::StateRestored,
            Event::LogRuntimeStatistics { .. } => EventKind::LogRuntimeStatistics,
            Event::HandlerError { .. } => EventKind::HandlerError,
            Event::Shutdown => EventKind::Shutdown,
        }
    }

    pub fn completed_runs(runs: Vec<AlgorithmRun>) -> Self {
        Event::AlgorithmRunCompleted { runs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(Event::ModelBuildEnd.kind(), EventKind::ModelBuildEnd);
        assert_eq!(
            Event::completed_runs(vec![]).kind(),
            EventKind::AlgorithmRunCompleted
        );
        let err = Event::HandlerError {
            source: EventKind::ModelBuildEnd,
            message: "boom".into(),
        };
        assert_eq!(err.kind(), EventKind::HandlerError);
        assert_eq!(EventKind::Shutdown.to_string(), "EventManagerShutdownEvent");
    }
}
