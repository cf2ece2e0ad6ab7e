/*!
 * Run Configuration
 *
 * The coordinator's configuration comes from the command line first, then
 * `BATCHGATE_*` environment overrides. Workers receive the subset they need
 * through their environment (see [`WorkerEnv`]).
 */

pub mod args;
pub mod env;
pub mod error;

pub use args::{parse_args, Invocation, WorkerArgs, USAGE};
pub use env::WorkerEnv;
pub use error::ConfigError;

use crate::core::limits::{
    DEFAULT_DEADLINE, DEFAULT_MAX_CONCURRENT, DEFAULT_MAX_DELAY, DEFAULT_MAX_TOTAL,
    DEFAULT_MIN_DELAY, WORKSPACE_KEY_PREFIX,
};
use rand::Rng;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the gate key when no explicit key is configured
pub const GATE_FILE_NAME: &str = "batchgate.gate";

/// Name of the worker binary looked up next to the coordinator
pub const WORKER_BIN_NAME: &str = "batchgate-worker";

/// Bounds of the random sleep a worker takes inside the critical section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayWindow {
    pub min: Duration,
    pub max: Duration,
}

impl DelayWindow {
    pub fn new(min: Duration, max: Duration) -> Result<Self, ConfigError> {
        if min > max {
            return Err(ConfigError::InvalidDelay {
                min_ms: min.as_millis() as u64,
                max_ms: max.as_millis() as u64,
            });
        }
        Ok(Self { min, max })
    }

    /// No delay at all
    pub fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Uniform sample in `[min, max]` with millisecond granularity
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        if max <= min {
            return self.min;
        }
        Duration::from_millis(rng.gen_range(min..=max))
    }
}

impl Default for DelayWindow {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_DELAY,
            max: DEFAULT_MAX_DELAY,
        }
    }
}

/// Coordinator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Input file, one item per line
    pub input: PathBuf,
    /// Total launch budget (-n), already clamped to the hard cap
    pub max_total: usize,
    /// Concurrently active workers (-s)
    pub max_concurrent: usize,
    /// Hard deadline for the whole run (-t)
    pub deadline: Duration,
    /// Directory holding output.log, palin.out and nopalin.out
    pub output_dir: PathBuf,
    /// Explicit gate key; defaults to a file in the output directory
    pub gate_key: Option<PathBuf>,
    /// Explicit workspace key; defaults to a per-run unique name
    pub workspace_key: Option<String>,
    /// Explicit worker binary; defaults to a sibling of the current executable
    pub worker_bin: Option<PathBuf>,
    pub delay: DelayWindow,
    /// Optional JSON-lines file receiving one critical-section span per worker
    pub timeline: Option<PathBuf>,
}

impl RunConfig {
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            max_total: DEFAULT_MAX_TOTAL,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            deadline: DEFAULT_DEADLINE,
            output_dir: PathBuf::from("."),
            gate_key: None,
            workspace_key: None,
            worker_bin: None,
            delay: DelayWindow::default(),
            timeline: None,
        }
    }

    pub fn gate_path(&self) -> PathBuf {
        self.gate_key
            .clone()
            .unwrap_or_else(|| self.output_dir.join(GATE_FILE_NAME))
    }

    /// Workspace key for this run; generated keys are unique per coordinator
    pub fn workspace_key(&self) -> String {
        self.workspace_key.clone().unwrap_or_else(|| {
            let suffix = uuid::Uuid::new_v4().simple().to_string();
            format!(
                "{}{}-{}",
                WORKSPACE_KEY_PREFIX,
                std::process::id(),
                &suffix[..8]
            )
        })
    }

    /// Locate the worker binary, failing early if it does not exist
    pub fn resolve_worker_bin(&self) -> Result<PathBuf, ConfigError> {
        let path = match self.worker_bin {
            Some(ref path) => path.clone(),
            None => std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf))
                .unwrap_or_else(|| PathBuf::from("."))
                .join(WORKER_BIN_NAME),
        };
        if !path.is_file() {
            return Err(ConfigError::WorkerBinary(path));
        }
        Ok(path)
    }
}
