/*!
 * IPC Module
 * Shared workspace and gate used between the coordinator and its workers
 */

pub mod gate;
pub mod shm;

pub use gate::{Gate, GateError, GateGuard};
pub use shm::{Workspace, WorkspaceError, WorkspaceView};
