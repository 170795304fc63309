// src/model/status.rs
//! Termination progress snapshots

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a termination status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminationStatusType {
    CpuTime,
    WallTime,
    NumberOfRuns,
    Other,
}

/// Snapshot of one condition's progress, regenerated on demand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminationStatus {
    /// Label, e.g. `CPUTIME`
    pub name: String,

    pub current: f64,

    pub max: f64,

    pub status_type: TerminationStatusType,

    /// Human readable progress text
    pub friendly_text: String,
}

impl TerminationStatus {
    /// Status for a value counting up to a maximum
    pub fn value_max(
        status_type: TerminationStatusType,
        current: f64,
        max: f64,
        name: &str,
        friendly_name: &str,
        unit: &str,
    ) -> Self {
        let percent = if max > 0.0 && max.is_finite() {
            (current / max) * 100.0
        } else {
            0.0
        };
        let friendly_text = format!(
            "{friendly} used: {cur} {unit} ({pct:.2}%)\n{friendly} remaining: {rem} {unit}\n",
            friendly = friendly_name,
            cur = current,
            unit = unit,
            pct = percent,
            rem = max - current,
        );

        Self {
            name: name.to_string(),
            current,
            max,
            status_type,
            friendly_text,
        }
    }
}

impl fmt::Display for TerminationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.friendly_text)
    }
}
