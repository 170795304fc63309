// src/utils/mod.rs
//! Shared utilities: error taxonomy, configuration loading and exit codes.

pub mod atomic;
pub mod config;
pub mod errors;
pub mod return_values;

pub use config::AclibConfig;
pub use errors::{EngineError, Result};
