// src/model/configuration.rs
//! Immutable parameter configurations

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Parameter name → value mapping for the active parameters of one
/// configuration. Cloning shares the underlying map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ParamConfiguration {
    values: Arc<BTreeMap<String, String>>,
}

impl ParamConfiguration {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self {
            values: Arc::new(values),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Copy of the underlying mapping
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.values.as_ref().clone()
    }

    /// Active parameters in name order
    pub fn active_parameters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Short stable identifier for log output
    pub fn friendly_id_hex(&self) -> String {
        let mut hasher = DefaultHasher::new();
        self.values.hash(&mut hasher);
        format!("{:08X}", hasher.finish() as u32)
    }
}

impl fmt::Display for ParamConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in self.active_parameters() {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "-{} '{}'", name, value)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_map_is_a_copy() {
        let config = ParamConfiguration::from_pairs([("alpha", "1"), ("beta", "x")]);
        let mut copy = config.to_map();
        copy.insert("gamma".into(), "2".into());

        assert_eq!(config.len(), 2);
        assert_eq!(config.get("gamma"), None);
        assert_eq!(config.get("alpha"), Some("1"));
    }

    #[test]
    fn test_friendly_id_is_content_based() {
        let a = ParamConfiguration::from_pairs([("alpha", "1")]);
        let b = ParamConfiguration::from_pairs([("alpha", "1")]);
        let c = ParamConfiguration::from_pairs([("alpha", "2")]);

        assert_eq!(a.friendly_id_hex(), b.friendly_id_hex());
        assert_ne!(a, c);
    }

    #[test]
    fn test_display() {
        let config = ParamConfiguration::from_pairs([("b", "2"), ("a", "1")]);
        assert_eq!(config.to_string(), "-a '1' -b '2'");
    }
}
