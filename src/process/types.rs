/*!
 * Process Types
 * Worker outcomes and run reports
 */

use crate::core::types::{ItemIndex, Pid};
use crate::signals::TripCause;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::time::Duration;

/// How a worker ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    /// Exited normally with this code
    Exited(i32),
    /// Killed by this signal number
    Signaled(i32),
    /// In-process task cancelled before completion
    Aborted,
    /// Status could not be collected
    Unknown,
}

impl WorkerStatus {
    pub fn from_exit_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            WorkerStatus::Exited(code)
        } else if let Some(signal) = status.signal() {
            WorkerStatus::Signaled(signal)
        } else {
            WorkerStatus::Unknown
        }
    }

    pub fn success(&self) -> bool {
        matches!(self, WorkerStatus::Exited(0))
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerStatus::Exited(code) => write!(f, "exited with exit code {}", code),
            WorkerStatus::Signaled(signal) => write!(f, "was killed by signal {}", signal),
            WorkerStatus::Aborted => write!(f, "was aborted"),
            WorkerStatus::Unknown => write!(f, "ended with unknown status"),
        }
    }
}

/// A reaped worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerExit {
    pub index: ItemIndex,
    pub pid: Option<Pid>,
    pub status: WorkerStatus,
}

/// Summary of one launcher run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub item_count: usize,
    /// min(total budget, item count)
    pub limit: usize,
    pub launched: usize,
    pub succeeded: usize,
    /// Non-zero exits, signal deaths and launch failures
    pub failed: usize,
    /// Highest number of simultaneously active workers observed
    pub peak_active: usize,
    /// Set when the deadline or an interrupt aborted the run
    pub trip: Option<TripCause>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn completed(&self) -> bool {
        self.trip.is_none() && self.failed == 0 && self.succeeded == self.limit
    }
}
