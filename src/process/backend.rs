/*!
 * Launch Backend
 * Seam between the launcher's admission/reap loop and the execution units
 */

use super::types::WorkerExit;
use crate::core::errors::BatchError;
use crate::core::types::{ItemIndex, Pid};
use futures::future::BoxFuture;

/// A started worker and the future that resolves when it has been reaped
pub struct LaunchedWorker {
    pub pid: Option<Pid>,
    pub completion: BoxFuture<'static, WorkerExit>,
}

/// Starts execution units for item indices.
///
/// The launcher behaves identically whether units are OS processes
/// ([`super::ProcessBackend`]) or in-process tasks ([`super::TaskBackend`]).
pub trait LaunchBackend: Send + Sync {
    /// Start one unit bound to `index`
    fn launch(&self, index: ItemIndex) -> Result<LaunchedWorker, BatchError>;

    /// Ask every started, not yet reaped unit to stop. Returns how many were
    /// signalled. Safe to call more than once.
    fn terminate_all(&self) -> usize;
}
