// src/backends/random.rs
//! Backend producing seeded random runtimes
//!
//! Runtime is `max(0.01, U·(max - min) + min + trend·run_index)`. Runs whose
//! drawn runtime reaches the cutoff time out at the cutoff.

use crate::evaluator::{RunExecutor, SharedObserver};
use crate::model::{AlgorithmRun, ExecutionConfig, RunConfig, RunResult};
use crate::utils::errors::{EngineError, Result};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

const MIN_RUNTIME: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomOptions {
    pub min_response: f64,
    pub max_response: f64,

    /// Added per completed run, lets runtimes drift over time
    pub trend_coefficient: f64,
    pub seed: u64,

    /// Return outcomes in shuffled order. Breaks the evaluator contract,
    /// used to test that callers notice.
    pub shuffle_responses: bool,
    pub persistent: bool,
    pub additional_run_data: String,
}

impl Default for RandomOptions {
    fn default() -> Self {
        Self {
            min_response: 0.0,
            max_response: 10.0,
            trend_coefficient: 0.0,
            seed: 0,
            shuffle_responses: false,
            persistent: false,
            additional_run_data: String::new(),
        }
    }
}

struct RandomState {
    rng: StdRng,
    runs: u64,
}

pub struct RandomBackend {
    exec: Arc<ExecutionConfig>,
    options: RandomOptions,
    state: Mutex<RandomState>,
}

impl RandomBackend {
    pub fn new(exec: Arc<ExecutionConfig>, options: RandomOptions) -> Result<Self> {
        if options.max_response < options.min_response {
            return Err(EngineError::Parameter(
                "Maximum response must be greater than the minimum response".to_string(),
            ));
        }
        info!("Random backend initialized with seed: {}", options.seed);

        Ok(Self {
            exec,
            state: Mutex::new(RandomState {
                rng: StdRng::seed_from_u64(options.seed),
                runs: 0,
            }),
            options,
        })
    }

    fn draw(&self, state: &mut RandomState, rc: &RunConfig) -> Result<AlgorithmRun> {
        let scale = self.options.max_response - self.options.min_response;
        let runtime = (state.rng.gen::<f64>() * scale
            + self.options.min_response
            + self.options.trend_coefficient * state.runs as f64)
            .max(MIN_RUNTIME);
        state.runs += 1;

        let (result, runtime) = if runtime >= rc.cutoff_time() {
            (RunResult::Timeout, rc.cutoff_time())
        } else {
            (RunResult::Sat, runtime)
        };

        Ok(AlgorithmRun::new(
            Arc::clone(&self.exec),
            rc.clone(),
            result,
            runtime,
            -1.0,
            0.0,
            rc.seed(),
            0.0,
        )?
        .with_additional_run_data(self.options.additional_run_data.clone()))
    }
}

impl RunExecutor for RandomBackend {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn execute(
        &self,
        runs: &[RunConfig],
        _observer: Option<&SharedObserver>,
    ) -> Result<Vec<AlgorithmRun>> {
        let mut state = self.state.lock();
        let mut completed = runs
            .iter()
            .map(|rc| self.draw(&mut state, rc))
            .collect::<Result<Vec<_>>>()?;

        if self.options.shuffle_responses {
            completed.shuffle(&mut state.rng);
        }
        Ok(completed)
    }

    fn are_runs_persisted(&self) -> bool {
        self.options.persistent
    }
}
