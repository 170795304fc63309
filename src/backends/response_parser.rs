// src/backends/response_parser.rs
//! Result line parsing
//!
//! Wrappers report their outcome on one line:
//!
//! ```text
//! Result for SMAC: <outcome>, <runtime>, <runlength>, <quality>, <seed>[, <additional data>]
//! ```
//!
//! A malformed line is never fatal. It becomes a CRASHED run with zero
//! measurements, logged together with the call that produced it.

use crate::backends::cli::command::call_string;
use crate::model::{AlgorithmRun, ExecutionConfig, RunConfig, RunResult};
use crate::utils::errors::{EngineError, Result};
use regex::Regex;
use std::sync::Arc;
use tracing::{error, warn};

const RESULT_LINE_PATTERN: &str =
    r"^\s*(Final)?\s*[Rr]esult\s+(?:([Ff]or)|([oO]f))\s+(?:(HAL)|(ParamILS)|(SMAC)|([tT]his [wW]rapper)):";

const REQUIRED_FIELDS: usize = 5;
const MAX_FIELDS: usize = 6;

#[derive(Debug, Clone)]
pub struct ResponseParser {
    pattern: Regex,
}

enum LineError {
    MissingFields(usize),
    Outcome(String),
    Number(String),
}

struct ParsedLine {
    result: RunResult,
    runtime: f64,
    run_length: f64,
    quality: f64,
    seed: i64,
    additional_run_data: String,
}

impl ResponseParser {
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(RESULT_LINE_PATTERN)
            .map_err(|e| EngineError::Internal(format!("Invalid result line pattern: {}", e)))?;
        Ok(Self { pattern })
    }

    /// Whether `line` carries the result marker
    pub fn is_result_line(&self, line: &str) -> bool {
        self.pattern.is_match(line)
    }

    /// Parse a wrapper response into an outcome for `rc`
    pub fn parse(
        &self,
        line: &str,
        rc: &RunConfig,
        exec: &Arc<ExecutionConfig>,
        walltime: f64,
    ) -> Result<AlgorithmRun> {
        let marker = match self.pattern.find(line) {
            Some(marker) => marker,
            None => {
                error!(
                    "Target Algorithm Call failed:{}\nResponse:{}\nComment: Most likely the algorithm did not specify all of the required outputs that is <solved>,<runtime>,<runlength>,<quality>,<seed>",
                    call_string(exec, rc),
                    line.trim()
                );
                return crashed(rc, exec, walltime);
            }
        };

        let parsed = match parse_fields(&line[marker.end()..], line) {
            Ok(parsed) => parsed,
            Err(e) => {
                log_line_error(&e, exec, rc, line);
                return crashed(rc, exec, walltime);
            }
        };

        let run = AlgorithmRun::new(
            Arc::clone(exec),
            rc.clone(),
            parsed.result,
            parsed.runtime,
            parsed.run_length,
            parsed.quality,
            parsed.seed,
            walltime,
        );

        match run {
            Ok(run) => Ok(run.with_additional_run_data(parsed.additional_run_data)),
            Err(e) => {
                error!(
                    "Target Algorithm Call failed:{}\nResponse:{}\nComment: {}",
                    call_string(exec, rc),
                    line.trim(),
                    e
                );
                crashed(rc, exec, walltime)
            }
        }
    }
}

fn parse_fields(record: &str, line: &str) -> std::result::Result<ParsedLine, LineError> {
    let fields: Vec<&str> = record.trim().split(',').map(str::trim).collect();
    if fields.len() < REQUIRED_FIELDS {
        return Err(LineError::MissingFields(fields.len()));
    }
    if fields.len() > MAX_FIELDS {
        warn!(
            "Too many fields were encountered (expected 5 or 6) when parsing line (Additional Run Data cannot have commas): {}",
            line
        );
    }

    let result: RunResult = fields[0]
        .parse()
        .map_err(|_| LineError::Outcome(fields[0].to_string()))?;
    if !result.is_permitted_by_wrappers() {
        return Err(LineError::Outcome(fields[0].to_string()));
    }

    let number = |field: &str| {
        field
            .parse::<f64>()
            .map_err(|e| LineError::Number(format!("{}: {}", field, e)))
    };

    Ok(ParsedLine {
        result,
        runtime: number(fields[1])?,
        run_length: number(fields[2])?,
        quality: number(fields[3])?,
        seed: fields[4]
            .parse::<i64>()
            .map_err(|e| LineError::Number(format!("{}: {}", fields[4], e)))?,
        additional_run_data: fields.get(5).map(|s| s.to_string()).unwrap_or_default(),
    })
}

fn log_line_error(e: &LineError, exec: &ExecutionConfig, rc: &RunConfig, line: &str) {
    let comment = match e {
        LineError::MissingFields(found) => format!(
            "Most likely the algorithm did not specify all of the required outputs that is <solved>,<runtime>,<runlength>,<quality>,<seed> (found {} fields)",
            found
        ),
        LineError::Outcome(reported) => {
            let mut valid: Vec<&str> = [RunResult::Sat, RunResult::Unsat, RunResult::Timeout]
                .iter()
                .map(RunResult::as_str)
                .collect();
            valid.sort_unstable();
            format!(
                "Most likely the Algorithm did not report a result string as one of: {:?} (reported {})",
                valid, reported
            )
        }
        LineError::Number(detail) => format!(
            "Most likely one of the values of runLength, runtime, quality could not be parsed as a Double, or the seed could not be parsed as a valid long ({})",
            detail
        ),
    };

    error!(
        "Target Algorithm Call failed:{}\nResponse:{}\nComment: {}",
        call_string(exec, rc),
        line.trim(),
        comment
    );
    error!("Run will be counted as {}", RunResult::Crashed);
}

/// CRASHED outcome with zero measurements
pub(crate) fn crashed(
    rc: &RunConfig,
    exec: &Arc<ExecutionConfig>,
    walltime: f64,
) -> Result<AlgorithmRun> {
    AlgorithmRun::new(
        Arc::clone(exec),
        rc.clone(),
        RunResult::Crashed,
        0.0,
        0.0,
        0.0,
        rc.seed(),
        walltime,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::algorithm_run::test_support::*;

    fn parse(line: &str) -> AlgorithmRun {
        let parser = ResponseParser::new().unwrap();
        parser.parse(line, &run_config(1, 7, 10.0), &exec_config(), 2.0).unwrap()
    }

    #[test]
    fn test_parses_result_line() {
        let run = parse("Result for ParamILS: SAT,1.23,-1,0.0,42");
        assert_eq!(run.run_result(), RunResult::Sat);
        assert_eq!(run.runtime(), 1.23);
        assert_eq!(run.run_length(), -1.0);
        assert_eq!(run.quality(), 0.0);
        assert_eq!(run.result_seed(), 42);
        assert!(run.additional_run_data().is_empty());
        assert_eq!(run.wallclock_execution_time(), 2.0);
    }

    #[test]
    fn test_marker_variants() {
        let parser = ResponseParser::new().unwrap();
        assert!(parser.is_result_line("Final Result for SMAC: UNSAT, 1, 1, 1, 1"));
        assert!(parser.is_result_line("  result of this wrapper: SAT, 1, 1, 1, 1"));
        assert!(parser.is_result_line("Result for HAL: TIMEOUT, 1, 1, 1, 1"));
        assert!(!parser.is_result_line("Results for SMAC: SAT, 1, 1, 1, 1"));
        assert!(!parser.is_result_line("c Result for SMAC: SAT, 1, 1, 1, 1"));
    }

    #[test]
    fn test_additional_run_data() {
        let run = parse("Result for SMAC: UNSATISFIABLE, 0.5, 10, 3, 7, solver said hi");
        assert_eq!(run.run_result(), RunResult::Unsat);
        assert_eq!(run.quality(), 3.0);
        assert_eq!(run.additional_run_data(), "solver said hi");
    }

    #[test]
    fn test_too_few_fields_is_crashed() {
        let run = parse("Result for SMAC: SAT, 1.0, -1, 0");
        assert_eq!(run.run_result(), RunResult::Crashed);
        assert_eq!(run.runtime(), 0.0);
        assert_eq!(run.result_seed(), 7);
    }

    #[test]
    fn test_reserved_outcome_is_crashed() {
        assert_eq!(parse("Result for SMAC: ABORT, 1, 1, 1, 1").run_result(), RunResult::Crashed);
        assert_eq!(parse("Result for SMAC: KILLED, 1, 1, 1, 1").run_result(), RunResult::Crashed);
        assert_eq!(parse("Result for SMAC: MAYBE, 1, 1, 1, 1").run_result(), RunResult::Crashed);
    }

    #[test]
    fn test_bad_numbers_are_crashed() {
        assert_eq!(parse("Result for SMAC: SAT, fast, 1, 1, 1").run_result(), RunResult::Crashed);
        assert_eq!(parse("Result for SMAC: SAT, 1, 1, 1, 1.5").run_result(), RunResult::Crashed);
        assert_eq!(parse("Result for SMAC: SAT, -3, 1, 1, 1").run_result(), RunResult::Crashed);
    }

    #[test]
    fn test_no_marker_is_crashed() {
        assert_eq!(parse("Segmentation fault").run_result(), RunResult::Crashed);
    }
}
