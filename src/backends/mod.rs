// src/backends/mod.rs
//! Target algorithm backends
//!
//! Backends sit at the bottom of every evaluator chain and produce the
//! actual outcomes:
//!
//! - **cli**: one process per run, result line parsed from its output
//! - **ipc**: one UDP request/response exchange per run
//! - **constant / random / preloaded**: synthetic outcomes for testing
//! - **blackhole**: accepts async batches and never answers them
//!
//! Everything except the black hole is a blocking [`RunExecutor`] wrapped in
//! a [`SyncEvaluatorAdapter`](crate::evaluator::SyncEvaluatorAdapter).
//!
//! [`RunExecutor`]: crate::evaluator::RunExecutor

pub mod blackhole;
pub mod cli;
pub mod constant;
pub mod ipc;
pub mod preloaded;
pub mod random;
pub mod response_parser;

pub use blackhole::{BlackHoleEvaluator, BlackHoleOptions};
pub use cli::{CommandLineBackend, CommandLineOptions};
pub use constant::{ConstantBackend, ConstantOptions};
pub use ipc::{IpcBackend, IpcOptions};
pub use preloaded::{PreloadedBackend, PreloadedOptions};
pub use random::{RandomBackend, RandomOptions};
pub use response_parser::ResponseParser;
