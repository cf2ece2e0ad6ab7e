/*!
 * Process Executor
 * Spawns one worker OS process per admitted item and tracks it until reaped
 */

use super::backend::{LaunchBackend, LaunchedWorker};
use super::types::{WorkerExit, WorkerStatus};
use crate::config::{WorkerArgs, WorkerEnv};
use crate::core::errors::BatchError;
use crate::core::types::{ItemIndex, Pid};
use ahash::RandomState;
use dashmap::DashMap;
use futures::future::FutureExt;
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

/// Launches `batchgate-worker` processes
pub struct ProcessBackend {
    program: PathBuf,
    env: WorkerEnv,
    item_count: usize,
    // Workers started and not yet reaped, keyed by OS pid
    live: Arc<DashMap<Pid, ItemIndex, RandomState>>,
}

impl ProcessBackend {
    pub fn new(program: impl Into<PathBuf>, env: WorkerEnv, item_count: usize) -> Self {
        let program = program.into();
        info!(program = %program.display(), item_count, "Process executor initialized");
        Self {
            program,
            env,
            item_count,
            live: Arc::new(DashMap::with_hasher(RandomState::new())),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Number of workers started and not yet reaped
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    fn signal_all(&self, signal: Signal) -> usize {
        let mut signalled = 0;
        for entry in self.live.iter() {
            let (pid, index) = (*entry.key(), *entry.value());
            // Entries are removed right after the child is reaped; a pid can
            // only be recycled in the gap between those two steps
            match kill(nix::unistd::Pid::from_raw(pid as i32), signal) {
                Ok(()) => {
                    debug!(pid, index, ?signal, "Signalled worker");
                    signalled += 1;
                }
                Err(Errno::ESRCH) => debug!(pid, index, "Worker already gone"),
                Err(errno) => warn!(pid, index, error = %errno, "Failed to signal worker"),
            }
        }
        signalled
    }
}

impl LaunchBackend for ProcessBackend {
    fn launch(&self, index: ItemIndex) -> Result<LaunchedWorker, BatchError> {
        let args = WorkerArgs::new(index, self.item_count);

        let mut cmd = Command::new(&self.program);
        cmd.args(args.to_args())
            .envs(self.env.to_vars())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| BatchError::io("spawn worker", e))?;

        let pid = child.id();
        if let Some(pid) = pid {
            self.live.insert(pid, index);
        }
        info!(index, pid, "Launched worker");

        let live = Arc::clone(&self.live);
        let completion = async move {
            let status = match child.wait().await {
                Ok(status) => WorkerStatus::from_exit_status(status),
                Err(e) => {
                    error!(index, pid, error = %e, "Failed to wait for worker");
                    WorkerStatus::Unknown
                }
            };
            if let Some(pid) = pid {
                live.remove(&pid);
            }
            WorkerExit { index, pid, status }
        }
        .boxed();

        Ok(LaunchedWorker { pid, completion })
    }

    fn terminate_all(&self) -> usize {
        self.signal_all(Signal::SIGTERM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DelayWindow;

    fn env() -> WorkerEnv {
        WorkerEnv {
            workspace_key: "/batchgate-executor-test".to_string(),
            gate_key: PathBuf::from("/tmp/batchgate-executor-test.gate"),
            output_dir: PathBuf::from("/tmp"),
            delay: DelayWindow::none(),
            timeline: None,
        }
    }

    #[tokio::test]
    async fn test_spawn_and_reap_exit_code() {
        // `false` ignores its arguments and exits 1
        let backend = ProcessBackend::new("false", env(), 1);
        let worker = backend.launch(0).unwrap();
        assert!(worker.pid.is_some());

        let exit = worker.completion.await;
        assert_eq!(exit.index, 0);
        assert_eq!(exit.status, WorkerStatus::Exited(1));
        assert_eq!(backend.live_count(), 0);
    }

    #[tokio::test]
    async fn test_terminate_all_signals_live_workers() {
        let backend = ProcessBackend::new("sleep", env(), 100);
        // `sleep 10 100`: index 10, item count 100 -> sleeps 110s unless killed
        let worker = backend.launch(10).unwrap();
        assert_eq!(backend.live_count(), 1);

        assert_eq!(backend.terminate_all(), 1);
        let exit = worker.completion.await;
        assert_eq!(exit.status, WorkerStatus::Signaled(libc_sigterm()));
        assert_eq!(backend.terminate_all(), 0);
    }

    #[tokio::test]
    async fn test_missing_program_fails_launch() {
        let backend = ProcessBackend::new("/nonexistent/batchgate-worker", env(), 1);
        assert!(matches!(backend.launch(0), Err(BatchError::Io { .. })));
    }

    fn libc_sigterm() -> i32 {
        Signal::SIGTERM as i32
    }
}
