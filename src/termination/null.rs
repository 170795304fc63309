// src/termination/null.rs
//! Condition that never stops

use crate::model::TerminationStatus;
use crate::termination::TerminationCondition;

#[derive(Debug, Default)]
pub struct NullTerminationCondition;

impl TerminationCondition for NullTerminationCondition {
    fn must_stop(&self) -> bool {
        false
    }

    fn status(&self) -> Vec<TerminationStatus> {
        Vec::new()
    }

    fn reason(&self) -> String {
        String::new()
    }
}
