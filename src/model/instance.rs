// src/model/instance.rs
//! Problem instances and instance/seed pairs

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A problem instance the target algorithm is run on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProblemInstance {
    /// Numeric identifier, unique within a scenario
    pub id: u32,

    /// Instance name as passed to the target algorithm
    pub name: String,

    /// Free-form instance specific information (passed through verbatim)
    #[serde(default)]
    pub instance_specific_info: String,
}

impl ProblemInstance {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            instance_specific_info: String::new(),
        }
    }

    pub fn with_instance_specific_info(mut self, info: impl Into<String>) -> Self {
        self.instance_specific_info = info.into();
        self
    }

    /// Instance specific info as sent on the command line (`0` when empty)
    pub fn instance_specific_info_token(&self) -> &str {
        if self.instance_specific_info.trim().is_empty() {
            "0"
        } else {
            &self.instance_specific_info
        }
    }
}

impl fmt::Display for ProblemInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance#{} ({})", self.id, self.name)
    }
}

/// Immutable (instance, seed) pairing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProblemInstanceSeedPair {
    instance: ProblemInstance,
    seed: i64,
}

impl ProblemInstanceSeedPair {
    pub fn new(instance: ProblemInstance, seed: i64) -> Self {
        Self { instance, seed }
    }

    pub fn instance(&self) -> &ProblemInstance {
        &self.instance
    }

    pub fn seed(&self) -> i64 {
        self.seed
    }
}

impl Ord for ProblemInstanceSeedPair {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instance
            .id
            .cmp(&other.instance.id)
            .then(self.seed.cmp(&other.seed))
            .then_with(|| self.instance.name.cmp(&other.instance.name))
            .then_with(|| {
                self.instance
                    .instance_specific_info
                    .cmp(&other.instance.instance_specific_info)
            })
    }
}

impl PartialOrd for ProblemInstanceSeedPair {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ProblemInstanceSeedPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Instance:{}, Seed:{}>", self.instance.id, self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_by_instance_then_seed() {
        let a = ProblemInstanceSeedPair::new(ProblemInstance::new(1, "b.cnf"), 9);
        let b = ProblemInstanceSeedPair::new(ProblemInstance::new(2, "a.cnf"), 1);
        let c = ProblemInstanceSeedPair::new(ProblemInstance::new(2, "a.cnf"), 5);

        let mut pairs = vec![c.clone(), a.clone(), b.clone()];
        pairs.sort();
        assert_eq!(pairs, vec![a, b, c]);
    }

    #[test]
    fn test_instance_specific_info_token() {
        let plain = ProblemInstance::new(1, "x");
        assert_eq!(plain.instance_specific_info_token(), "0");

        let info = ProblemInstance::new(1, "x").with_instance_specific_info("SAT");
        assert_eq!(info.instance_specific_info_token(), "SAT");
    }
}
