// src/lib.rs
//! ACLib Engine Library
//!
//! Core of an automatic algorithm configuration framework: run a black-box
//! target algorithm on many configurations and problem instances under a
//! budget, and decide when to stop.
//!
//! # Architecture
//!
//! The engine is structured into several key modules:
//!
//! - **model**: run requests, outcomes and configurations
//! - **evaluator**: the evaluator contract, sync adapter and chain builder
//! - **decorators**: composable cross-cutting evaluator behaviour
//! - **backends**: command line, UDP and synthetic target algorithm backends
//! - **events**: event bus with asynchronous dispatch and flush barriers
//! - **termination**: stopping criteria combined with logical OR
//! - **observability**: tracing subscriber setup
//! - **utils**: errors, configuration and exit codes

pub mod backends;
pub mod decorators;
pub mod evaluator;
pub mod events;
pub mod model;
pub mod observability;
pub mod termination;
pub mod utils;

// Re-export commonly used types
pub use evaluator::{build_evaluator, Evaluator, EvaluatorCallback, EvaluatorOptions, RunObserver};
pub use events::{Event, EventKind, EventManager};
pub use model::{AlgorithmRun, ExecutionConfig, ParamConfiguration, RunConfig, RunResult};
pub use termination::{CompositeTerminationCondition, TerminationCondition, TerminationCriteria};
pub use utils::config::AclibConfig;
pub use utils::errors::{EngineError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
