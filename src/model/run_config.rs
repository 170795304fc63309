// src/model/run_config.rs
//! Run requests

use crate::model::{ParamConfiguration, ProblemInstanceSeedPair};
use crate::utils::errors::{EngineError, Result};
use std::fmt;
use std::hash::{Hash, Hasher};

/// One request to execute the target algorithm.
///
/// Equality and hashing cover the instance/seed pair and the configuration
/// only. Two requests that differ solely in cutoff (for example after
/// adaptive capping) are the same logical request.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pisp: ProblemInstanceSeedPair,
    cutoff_time: f64,
    config: ParamConfiguration,
    cutoff_less_than_max: bool,
}

impl RunConfig {
    pub fn new(
        pisp: ProblemInstanceSeedPair,
        cutoff_time: f64,
        config: ParamConfiguration,
    ) -> Result<Self> {
        Self::with_capping(pisp, cutoff_time, config, false)
    }

    /// Create a request whose cutoff may have been capped below the
    /// scenario maximum
    pub fn with_capping(
        pisp: ProblemInstanceSeedPair,
        cutoff_time: f64,
        config: ParamConfiguration,
        cutoff_less_than_max: bool,
    ) -> Result<Self> {
        if cutoff_time.is_nan() || cutoff_time < 0.0 {
            return Err(EngineError::Parameter(format!(
                "Cutoff time must be non-negative and not NaN: {}",
                cutoff_time
            )));
        }

        Ok(Self {
            pisp,
            cutoff_time,
            config,
            cutoff_less_than_max,
        })
    }

    pub fn problem_instance_seed_pair(&self) -> &ProblemInstanceSeedPair {
        &self.pisp
    }

    pub fn cutoff_time(&self) -> f64 {
        self.cutoff_time
    }

    pub fn param_configuration(&self) -> &ParamConfiguration {
        &self.config
    }

    pub fn has_cutoff_less_than_max(&self) -> bool {
        self.cutoff_less_than_max
    }

    pub fn seed(&self) -> i64 {
        self.pisp.seed()
    }
}

impl PartialEq for RunConfig {
    fn eq(&self, other: &Self) -> bool {
        self.pisp == other.pisp && self.config == other.config
    }
}

impl Eq for RunConfig {}

impl Hash for RunConfig {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pisp.hash(state);
        self.config.hash(state);
    }
}

impl fmt::Display for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Instance:{}, Seed:{}, Config:0x{}, Kappa:{}>",
            self.pisp.instance().id,
            self.pisp.seed(),
            self.config.friendly_id_hex(),
            self.cutoff_time
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProblemInstance;
    use std::collections::HashSet;

    fn pisp(seed: i64) -> ProblemInstanceSeedPair {
        ProblemInstanceSeedPair::new(ProblemInstance::new(1, "inst.cnf"), seed)
    }

    #[test]
    fn test_negative_cutoff_rejected() {
        let result = RunConfig::new(pisp(1), -1.0, ParamConfiguration::default());
        assert!(matches!(result, Err(EngineError::Parameter(_))));

        let nan = RunConfig::new(pisp(1), f64::NAN, ParamConfiguration::default());
        assert!(nan.is_err());
    }

    #[test]
    fn test_equality_ignores_cutoff() {
        let config = ParamConfiguration::from_pairs([("a", "1")]);
        let short = RunConfig::new(pisp(7), 1.0, config.clone()).unwrap();
        let long = RunConfig::with_capping(pisp(7), 300.0, config.clone(), true).unwrap();
        let other_seed = RunConfig::new(pisp(8), 1.0, config).unwrap();

        assert_eq!(short, long);
        assert_ne!(short, other_seed);

        let set: HashSet<RunConfig> = [short, long, other_seed].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_display() {
        let rc = RunConfig::new(pisp(42), 5.0, ParamConfiguration::default()).unwrap();
        let text = rc.to_string();
        assert!(text.starts_with("<Instance:1, Seed:42, Config:0x"));
        assert!(text.ends_with("Kappa:5>"));
    }
}
