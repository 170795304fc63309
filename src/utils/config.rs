// src/utils/config.rs
//! Engine configuration
//!
//! Precedence, lowest to highest:
//! 1. Built-in defaults (`#[serde(default)]` on every section)
//! 2. Configuration file (YAML, TOML or JSON, chosen by extension)
//! 3. Environment variables, `ACLIB__SECTION__KEY`, e.g. `ACLIB__EVALUATOR__BACKEND=random`

use crate::evaluator::EvaluatorOptions;
use crate::model::{ExecutionConfig, ProblemInstance};
use crate::termination::TerminationCriteria;
use crate::utils::errors::{EngineError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const ENV_PREFIX: &str = "ACLIB";
const ENV_SEPARATOR: &str = "__";
const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AclibConfig {
    pub scenario: ScenarioConfig,
    pub evaluator: EvaluatorOptions,
    pub termination: TerminationCriteria,
    pub logging: LoggingConfig,
}

/// Target algorithm and the instances it is run on
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Command used to invoke the target algorithm, split on whitespace
    pub algorithm_executable: String,
    pub execution_directory: PathBuf,
    pub deterministic: bool,

    /// Maximum cutoff time per run in seconds
    pub cutoff_time: f64,

    /// Instance names, numbered from 1 in this order
    pub instances: Vec<String>,

    /// Seed for the instance seeds handed to runs
    pub seed: u64,

    /// Parameter values of the configuration that is evaluated
    pub configuration: BTreeMap<String, String>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            algorithm_executable: String::new(),
            execution_directory: PathBuf::from("."),
            deterministic: false,
            cutoff_time: 300.0,
            instances: Vec::new(),
            seed: 0,
            configuration: BTreeMap::new(),
        }
    }
}

impl ScenarioConfig {
    pub fn execution_config(&self) -> Result<ExecutionConfig> {
        ExecutionConfig::new(
            self.algorithm_executable.clone(),
            self.execution_directory.clone(),
            self.deterministic,
            self.cutoff_time,
        )
    }

    pub fn problem_instances(&self) -> Vec<ProblemInstance> {
        self.instances
            .iter()
            .enumerate()
            .map(|(index, name)| ProblemInstance::new(index as u32 + 1, name.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level; `RUST_LOG` overrides it
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl AclibConfig {
    /// Load defaults, then `path` if given, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }

        let config: AclibConfig = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !VALID_LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(EngineError::ConfigError(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        if self.scenario.cutoff_time.is_nan() || self.scenario.cutoff_time < 0.0 {
            return Err(EngineError::ConfigError(format!(
                "scenario.cutoff_time must be non-negative: {}",
                self.scenario.cutoff_time
            )));
        }

        self.termination.validate()?;
        self.evaluator
            .validate()
            .map_err(|e| EngineError::ConfigError(format!("evaluator: {}", e)))
    }
}
