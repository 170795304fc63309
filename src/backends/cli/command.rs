// src/backends/cli/command.rs
//! Target algorithm call strings
//!
//! Argument order is fixed by the wrapper protocol:
//!
//! ```text
//! <executable...> <instance> <instance info> <cutoff> <run length> <seed> -name 'value' ...
//! ```

use crate::model::{ExecutionConfig, RunConfig};

/// Run length passed to wrappers, there is no run length limit
pub const RUN_LENGTH_SENTINEL: i32 = i32::MAX;

/// Arguments after the executable, shared by the process and IPC backends
pub fn run_arguments(rc: &RunConfig) -> Vec<String> {
    let instance = rc.problem_instance_seed_pair().instance();

    let mut args = vec![
        instance.name.clone(),
        instance.instance_specific_info_token().to_string(),
        rc.cutoff_time().to_string(),
        RUN_LENGTH_SENTINEL.to_string(),
        rc.seed().to_string(),
    ];

    for (name, value) in rc.param_configuration().active_parameters() {
        args.push(format!("-{}", name));
        args.push(format!("'{}'", value));
    }
    args
}

/// Full argv for a run: executable tokens followed by [`run_arguments`]
pub fn command_tokens(exec: &ExecutionConfig, rc: &RunConfig) -> Vec<String> {
    let mut tokens: Vec<String> = exec
        .algorithm_executable()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    tokens.extend(run_arguments(rc));
    tokens
}

/// Human readable call string for logs
pub fn call_string(exec: &ExecutionConfig, rc: &RunConfig) -> String {
    format!(
        "cd {} ; {}",
        exec.algorithm_execution_directory().display(),
        command_tokens(exec, rc).join(" ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ParamConfiguration, ProblemInstance, ProblemInstanceSeedPair};

    fn request() -> RunConfig {
        RunConfig::new(
            ProblemInstanceSeedPair::new(
                ProblemInstance::new(3, "inst/a.cnf").with_instance_specific_info("hard"),
                42,
            ),
            5.0,
            ParamConfiguration::from_pairs([("alpha", "0.5"), ("beta", "on")]),
        )
        .unwrap()
    }

    #[test]
    fn test_argument_order() {
        let exec = ExecutionConfig::new("python wrapper.py", "/tmp", false, 10.0).unwrap();
        let tokens = command_tokens(&exec, &request());

        assert_eq!(
            tokens,
            vec![
                "python", "wrapper.py", "inst/a.cnf", "hard", "5", "2147483647", "42", "-alpha",
                "'0.5'", "-beta", "'on'",
            ]
        );
    }

    #[test]
    fn test_empty_instance_info_is_zero() {
        let rc = RunConfig::new(
            ProblemInstanceSeedPair::new(ProblemInstance::new(1, "a"), 1),
            1.5,
            ParamConfiguration::from_pairs([("x", "1")]),
        )
        .unwrap();

        let args = run_arguments(&rc);
        assert_eq!(args[1], "0");
        assert_eq!(args[2], "1.5");
    }

    #[test]
    fn test_call_string_names_directory() {
        let exec = ExecutionConfig::new("./solver", "/opt/run", false, 10.0).unwrap();
        assert!(call_string(&exec, &request()).starts_with("cd /opt/run ; ./solver inst/a.cnf"));
    }
}
