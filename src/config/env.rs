/*!
 * Environment Configuration
 * Coordinator overrides and the worker's inherited environment
 */

use super::error::ConfigError;
use super::{DelayWindow, RunConfig};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_OUTPUT_DIR: &str = "BATCHGATE_OUTPUT_DIR";
pub const ENV_WORKER_BIN: &str = "BATCHGATE_WORKER_BIN";
pub const ENV_GATE_KEY: &str = "BATCHGATE_GATE_KEY";
pub const ENV_WORKSPACE_KEY: &str = "BATCHGATE_WORKSPACE";
pub const ENV_MIN_DELAY_MS: &str = "BATCHGATE_MIN_DELAY_MS";
pub const ENV_MAX_DELAY_MS: &str = "BATCHGATE_MAX_DELAY_MS";
pub const ENV_TIMELINE: &str = "BATCHGATE_TIMELINE";
pub const ENV_TRACE_JSON: &str = "BATCHGATE_TRACE_JSON";

fn parse_millis(var: &'static str, value: String) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Read the delay window from the environment, starting from `base`
fn delay_from<F>(base: DelayWindow, lookup: &F) -> Result<DelayWindow, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let min = match non_empty(lookup(ENV_MIN_DELAY_MS)) {
        Some(v) => parse_millis(ENV_MIN_DELAY_MS, v)?,
        None => base.min,
    };
    let max = match non_empty(lookup(ENV_MAX_DELAY_MS)) {
        Some(v) => parse_millis(ENV_MAX_DELAY_MS, v)?,
        None => base.max,
    };
    DelayWindow::new(min, max)
}

impl RunConfig {
    /// Apply `BATCHGATE_*` overrides from the process environment
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_env_lookup(|key| std::env::var(key).ok())
    }

    /// Apply `BATCHGATE_*` overrides using an arbitrary lookup
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = non_empty(lookup(ENV_OUTPUT_DIR)) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(bin) = non_empty(lookup(ENV_WORKER_BIN)) {
            self.worker_bin = Some(PathBuf::from(bin));
        }
        if let Some(gate) = non_empty(lookup(ENV_GATE_KEY)) {
            self.gate_key = Some(PathBuf::from(gate));
        }
        if let Some(key) = non_empty(lookup(ENV_WORKSPACE_KEY)) {
            self.workspace_key = Some(key);
        }
        if let Some(path) = non_empty(lookup(ENV_TIMELINE)) {
            self.timeline = Some(PathBuf::from(path));
        }
        self.delay = delay_from(self.delay, &lookup)?;
        Ok(self)
    }
}

/// Everything a worker needs besides its positional arguments.
/// The coordinator exports it into each child's environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerEnv {
    pub workspace_key: String,
    pub gate_key: PathBuf,
    pub output_dir: PathBuf,
    pub delay: DelayWindow,
    pub timeline: Option<PathBuf>,
}

impl WorkerEnv {
    /// Derive the worker environment from a run configuration
    pub fn for_run(config: &RunConfig, workspace_key: impl Into<String>) -> Self {
        Self {
            workspace_key: workspace_key.into(),
            gate_key: config.gate_path(),
            output_dir: config.output_dir.clone(),
            delay: config.delay,
            timeline: config.timeline.clone(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let workspace_key =
            non_empty(lookup(ENV_WORKSPACE_KEY)).ok_or(ConfigError::MissingEnv(ENV_WORKSPACE_KEY))?;
        let gate_key = non_empty(lookup(ENV_GATE_KEY))
            .map(PathBuf::from)
            .ok_or(ConfigError::MissingEnv(ENV_GATE_KEY))?;
        let output_dir = non_empty(lookup(ENV_OUTPUT_DIR))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let timeline = non_empty(lookup(ENV_TIMELINE)).map(PathBuf::from);
        let delay = delay_from(DelayWindow::default(), &lookup)?;

        Ok(Self {
            workspace_key,
            gate_key,
            output_dir,
            delay,
            timeline,
        })
    }

    /// Variables to export into a worker's environment
    pub fn to_vars(&self) -> Vec<(&'static str, String)> {
        let mut vars = vec![
            (ENV_WORKSPACE_KEY, self.workspace_key.clone()),
            (ENV_GATE_KEY, self.gate_key.display().to_string()),
            (ENV_OUTPUT_DIR, self.output_dir.display().to_string()),
            (ENV_MIN_DELAY_MS, self.delay.min.as_millis().to_string()),
            (ENV_MAX_DELAY_MS, self.delay.max.as_millis().to_string()),
        ];
        if let Some(ref timeline) = self.timeline {
            vars.push((ENV_TIMELINE, timeline.display().to_string()));
        }
        vars
    }
}
