/*!
 * Error Types
 * Centralized error handling with thiserror and miette support
 */

use miette::Diagnostic;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use super::types::{ItemIndex, Pid};
use crate::process::WorkerStatus;
use crate::signals::TripCause;

// Re-export subsystem errors so callers only need one import path
pub use crate::config::ConfigError;
pub use crate::ipc::gate::GateError;
pub use crate::ipc::shm::WorkspaceError;

/// Unified batch error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum BatchError {
    #[error("Configuration error: {0}")]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("Resource error: {0}")]
    #[diagnostic(transparent)]
    Resource(#[from] WorkspaceError),

    #[error("Synchronization error: {0}")]
    #[diagnostic(transparent)]
    Synchronization(#[from] GateError),

    #[error("Worker for item {index} {status}")]
    #[diagnostic(
        code(batch::worker_exit),
        help("The item was not retried. Check the worker's stderr for the failing operation.")
    )]
    WorkerExit {
        pid: Option<Pid>,
        index: ItemIndex,
        status: WorkerStatus,
    },

    #[error("Run aborted: {0}")]
    #[diagnostic(
        code(batch::deadline_exceeded),
        help("Raise the deadline with -t or reduce the per-item delay.")
    )]
    DeadlineExceeded(TripCause),

    #[error("Failed to append to {path}: {source}")]
    #[diagnostic(
        code(batch::output),
        help("Check that the output directory exists and is writable.")
    )]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error during {operation}: {source}")]
    #[diagnostic(code(batch::io))]
    Io {
        operation: &'static str,
        #[source]
        source: io::Error,
    },
}

impl BatchError {
    pub fn io(operation: &'static str, source: io::Error) -> Self {
        BatchError::Io { operation, source }
    }

    pub fn output(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BatchError::Output {
            path: path.into(),
            source,
        }
    }

    /// Process exit code a failing binary reports for this error.
    ///
    /// Failing to create or open the gate key is an allocation failure and
    /// reports like a workspace failure; only acquire/release failures on an
    /// existing gate are synchronization failures.
    pub fn exit_code(&self) -> u8 {
        match self {
            BatchError::Config(_) => 2,
            BatchError::Resource(_) | BatchError::Synchronization(GateError::Open { .. }) => 3,
            BatchError::Synchronization(_) => 4,
            BatchError::Output { .. } => 5,
            BatchError::WorkerExit { .. }
            | BatchError::DeadlineExceeded(_)
            | BatchError::Io { .. } => 1,
        }
    }
}

/// Common result type for batch operations
pub type BatchResult<T> = Result<T, BatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_distinguish_fatal_classes() {
        let config: BatchError = ConfigError::InvalidConcurrency(0).into();
        let resource: BatchError = WorkspaceError::NotFound("/missing".into()).into();
        let sync: BatchError = GateError::Missing(PathBuf::from("/tmp/gate")).into();

        assert_eq!(config.exit_code(), 2);
        assert_eq!(resource.exit_code(), 3);
        assert_eq!(sync.exit_code(), 4);
    }

    #[test]
    fn test_gate_open_failure_is_resource_class() {
        let open: BatchError = GateError::Open {
            path: PathBuf::from("/nonexistent/dir/batchgate.gate"),
            source: io::Error::from(io::ErrorKind::NotFound),
        }
        .into();
        let acquire: BatchError = GateError::Acquire {
            path: PathBuf::from("/tmp/gate"),
            source: io::Error::from(io::ErrorKind::Other),
        }
        .into();

        assert_eq!(open.exit_code(), 3);
        assert_eq!(acquire.exit_code(), 4);
    }

    #[test]
    fn test_worker_exit_display_names_item() {
        let err = BatchError::WorkerExit {
            pid: Some(42),
            index: 3,
            status: WorkerStatus::Exited(3),
        };
        let msg = err.to_string();
        assert!(msg.contains("item 3"));
        assert!(msg.contains("exit code 3"));
    }
}
