// src/utils/return_values.rs
//! Process exit codes understood by the surrounding tooling.
//!
//! Scripts match on these numeric values, so they must never change.

/// Normal termination
pub const SUCCESS: i32 = 0;

/// Invalid parameters or configuration
pub const PARAMETER_EXCEPTION: i32 = 1;

/// A restored run diverged from its recorded trajectory
pub const TRAJECTORY_DIVERGENCE: i32 = 2;

/// State could not be serialized or deserialized
pub const SERIALIZATION_EXCEPTION: i32 = 3;

/// Unrecoverable internal error
pub const OH_THE_HUMANITY_EXCEPTION: i32 = 66;

/// The event bus detected a flush from its own dispatch thread
pub const DEADLOCK_DETECTED: i32 = 101;

/// Anything else
pub const OTHER_EXCEPTION: i32 = 255;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_stable() {
        assert_eq!(SUCCESS, 0);
        assert_eq!(PARAMETER_EXCEPTION, 1);
        assert_eq!(TRAJECTORY_DIVERGENCE, 2);
        assert_eq!(SERIALIZATION_EXCEPTION, 3);
        assert_eq!(OH_THE_HUMANITY_EXCEPTION, 66);
        assert_eq!(DEADLOCK_DETECTED, 101);
        assert_eq!(OTHER_EXCEPTION, 255);
    }
}
