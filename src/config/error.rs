/*!
 * Configuration Errors
 */

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building a run or worker configuration.
/// All of them are fatal before any worker is launched.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ConfigError {
    #[error("Option -{0} requires a value")]
    #[diagnostic(code(config::missing_value), help("Run with -h for usage."))]
    MissingValue(char),

    #[error("Invalid value '{value}' for -{flag}: {reason}")]
    #[diagnostic(code(config::invalid_value), help("Run with -h for usage."))]
    InvalidValue {
        flag: char,
        value: String,
        reason: &'static str,
    },

    #[error("Unknown option: {0}")]
    #[diagnostic(code(config::unknown_option), help("Run with -h for usage."))]
    UnknownOption(String),

    #[error("Expected exactly one input file, got {0}")]
    #[diagnostic(
        code(config::wrong_arg_count),
        help("Invocation: batchgate [-n x] [-s x] [-t time] infile")
    )]
    WrongArgCount(usize),

    #[error("Concurrency cap must be at least 1, got {0}")]
    #[diagnostic(code(config::invalid_concurrency), help("Pass -s with a positive value."))]
    InvalidConcurrency(i64),

    #[error("Environment variable {var} has invalid value '{value}'")]
    #[diagnostic(code(config::invalid_env))]
    InvalidEnv { var: &'static str, value: String },

    #[error("Environment variable {0} is required")]
    #[diagnostic(
        code(config::missing_env),
        help("Workers are launched by the coordinator, which sets this variable.")
    )]
    MissingEnv(&'static str),

    #[error("Invalid delay window: min {min_ms} ms exceeds max {max_ms} ms")]
    #[diagnostic(code(config::invalid_delay))]
    InvalidDelay { min_ms: u64, max_ms: u64 },

    #[error("Invalid worker arguments: {0}")]
    #[diagnostic(
        code(config::worker_args),
        help("Invocation: batchgate-worker <index> <item-count>")
    )]
    WorkerArgs(String),

    #[error("Worker binary not found at {0}")]
    #[diagnostic(
        code(config::worker_binary),
        help("Install batchgate-worker next to batchgate or set BATCHGATE_WORKER_BIN.")
    )]
    WorkerBinary(PathBuf),
}
