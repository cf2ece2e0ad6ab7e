/*!
 * batchgate Library
 *
 * Bounded-concurrency batch processing across worker processes: a shared
 * read-only workspace, a crash-safe mutual-exclusion gate, a bounded
 * launcher and a deadline/interrupt controller.
 */

pub mod config;
pub mod coordinator;
pub mod core;
pub mod input;
pub mod ipc;
pub mod monitoring;
pub mod process;
pub mod signals;
pub mod worker;

// Re-exports
pub use config::{parse_args, ConfigError, Invocation, RunConfig, WorkerArgs, WorkerEnv, USAGE};
pub use coordinator::Coordinator;
pub use crate::core::errors::{BatchError, BatchResult};
pub use crate::core::types::{ItemIndex, Pid, Timestamp, WorkItem};
pub use ipc::{Gate, GateError, GateGuard, Workspace, WorkspaceError, WorkspaceView};
pub use monitoring::init_tracing;
pub use process::{
    BoundedLauncher, LaunchBackend, ProcessBackend, RunReport, TaskBackend, WorkerStatus,
};
pub use signals::{DeadlineController, TripCause};
pub use worker::{is_symmetric, OutputChannels, Predicate, ResultRecord, WorkerUnit};
