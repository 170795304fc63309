// src/main.rs
//! ACLib Engine
//!
//! Evaluates the scenario's configuration on its instances, round-robin with
//! fresh seeds, until a termination condition trips.
//!
//! ```text
//! aclib-engine --config scenario.yaml [--max-runs N]
//! ```

use aclib_engine::model::{ParamConfiguration, ProblemInstanceSeedPair};
use aclib_engine::observability::init_tracing;
use aclib_engine::utils::return_values;
use aclib_engine::{
    build_evaluator, AclibConfig, EngineError, EventManager, RunConfig, TerminationCondition,
};
use anyhow::Result;
use chrono::Local;
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Debug, Parser)]
#[command(name = "aclib-engine")]
#[command(about = "Evaluate a configuration on a scenario's instances until a termination condition trips", long_about = None)]
#[command(version)]
struct Cli {
    /// Scenario configuration file (YAML, TOML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many completed runs, overriding the configuration
    #[arg(long)]
    max_runs: Option<u64>,
}

fn run() -> Result<()> {
    let args = Cli::parse();

    let mut config = AclibConfig::load(args.config.as_deref())?;
    if let Some(max_runs) = args.max_runs {
        config.termination.total_run_limit = max_runs;
    }
    init_tracing(&config.logging)?;

    let started_at = Local::now();
    info!(
        "Starting ACLib Engine v{} at {}",
        aclib_engine::VERSION,
        started_at.to_rfc3339()
    );
    debug!("Effective configuration: {}", serde_json::to_string(&config)?);

    let instances = config.scenario.problem_instances();
    if instances.is_empty() {
        return Err(EngineError::ConfigError("scenario.instances is empty".to_string()).into());
    }

    let bus = EventManager::new()?;
    let termination = Arc::new(config.termination.build()?);
    Arc::clone(&termination).subscribe_to(&bus)?;

    let exec = Arc::new(config.scenario.execution_config()?);
    let evaluator = build_evaluator(&config.evaluator, Arc::clone(&exec), Some(bus.clone()))?;

    let configuration = ParamConfiguration::new(config.scenario.configuration.clone());
    let mut rng = StdRng::seed_from_u64(config.scenario.seed);
    let mut failure: Option<EngineError> = None;

    let mut next = 0usize;
    while !termination.must_stop() {
        let instance = instances[next % instances.len()].clone();
        next += 1;

        let pisp = ProblemInstanceSeedPair::new(instance, rng.gen_range(0..i64::from(i32::MAX)));
        let request = RunConfig::new(pisp, exec.algorithm_cutoff_time(), configuration.clone())?;

        match evaluator.evaluate(&[request]) {
            Ok(runs) => {
                for run in runs {
                    info!("{} => {}", run.run_config(), run.result_line());
                }
            }
            Err(e) => {
                error!("Evaluation failed: {}", e);
                failure = Some(e);
                break;
            }
        }
    }

    if failure.is_none() {
        info!("Terminating: {}", termination.reason());
    }
    for status in termination.status() {
        info!("{}", status);
    }

    evaluator.notify_shutdown();
    bus.shutdown()?;

    let elapsed = Local::now().signed_duration_since(started_at);
    info!(
        "Finished after {:.3} s wall-clock",
        elapsed.num_milliseconds() as f64 / 1000.0
    );

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

fn main() {
    if let Err(e) = run() {
        let code = e
            .downcast_ref::<EngineError>()
            .map(EngineError::exit_code)
            .unwrap_or(return_values::OTHER_EXCEPTION);
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(code);
    }
    std::process::exit(return_values::SUCCESS);
}
