// src/model/mod.rs
//! Run and configuration data model
//!
//! Value objects shared read-only across every thread of the engine:
//!
//! - **ProblemInstanceSeedPair**: what to run on, and with which seed
//! - **ParamConfiguration**: immutable parameter name → value mapping
//! - **RunConfig**: one run request (instance, seed, configuration, cutoff)
//! - **ExecutionConfig**: how to invoke the target algorithm
//! - **AlgorithmRun**: the validated outcome of executing a run request
//! - **KillableRun**: a snapshot that may still be cancelled while RUNNING
//! - **TerminationStatus**: observational progress of a stopping criterion
//!
//! # Ownership
//!
//! ```text
//! ExecutionConfig ──Arc──┐
//!                        ├──> AlgorithmRun ──> decorator ──> decorator ──> caller
//! RunConfig (clone) ─────┘
//! ```
//!
//! Nothing in this module is mutated after construction; decorators that
//! "correct" an outcome produce a new `AlgorithmRun`.

pub mod algorithm_run;
pub mod configuration;
pub mod execution_config;
pub mod instance;
pub mod kill;
pub mod run_config;
pub mod run_result;
pub mod status;

pub use algorithm_run::AlgorithmRun;
pub use configuration::ParamConfiguration;
pub use execution_config::ExecutionConfig;
pub use instance::{ProblemInstance, ProblemInstanceSeedPair};
pub use kill::{KillHandler, KillableRun};
pub use run_config::RunConfig;
pub use run_result::RunResult;
pub use status::{TerminationStatus, TerminationStatusType};
