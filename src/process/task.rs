/*!
 * Task Backend
 * Runs execution units as Tokio tasks inside the coordinator process
 */

use super::backend::{LaunchBackend, LaunchedWorker};
use super::types::{WorkerExit, WorkerStatus};
use crate::core::errors::{BatchError, BatchResult};
use crate::core::types::{ItemIndex, WorkItem};
use crate::worker::{OutputChannels, Predicate, ResultRecord};
use ahash::RandomState;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::AbortHandle;
use tracing::{debug, info};

/// Work run for one item index
pub type TaskJob = Arc<dyn Fn(ItemIndex) -> BoxFuture<'static, BatchResult<()>> + Send + Sync>;

/// Launches in-process tasks instead of OS processes.
///
/// A job error maps to `Exited(exit_code)`, cancellation to `Aborted` and a
/// panic to `Unknown`, so the launcher sees the same outcomes it would see
/// from worker processes.
pub struct TaskBackend {
    job: TaskJob,
    live: Arc<DashMap<ItemIndex, AbortHandle, RandomState>>,
}

impl TaskBackend {
    pub fn new<F, Fut>(job: F) -> Self
    where
        F: Fn(ItemIndex) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = BatchResult<()>> + Send + 'static,
    {
        Self {
            job: Arc::new(move |index| job(index).boxed()),
            live: Arc::new(DashMap::with_hasher(RandomState::new())),
        }
    }

    /// Evaluate `predicate` over `items` and append each outcome through
    /// `channels`. The mutex plays the gate's role for in-process units.
    pub fn evaluating(
        items: Arc<[WorkItem]>,
        predicate: Predicate,
        channels: Arc<Mutex<OutputChannels>>,
    ) -> Self {
        let pid = std::process::id();
        Self::new(move |index| {
            let items = Arc::clone(&items);
            let channels = Arc::clone(&channels);
            async move {
                let item = items.get(index).ok_or_else(|| {
                    BatchError::Resource(crate::ipc::WorkspaceError::IndexOutOfRange {
                        index,
                        len: items.len(),
                    })
                })?;
                let record = ResultRecord::new(index, pid, &item.text, predicate(&item.text));
                let guard = channels.lock();
                guard.append(&record)
            }
        })
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

impl LaunchBackend for TaskBackend {
    fn launch(&self, index: ItemIndex) -> Result<LaunchedWorker, BatchError> {
        let handle = tokio::spawn((self.job)(index));
        self.live.insert(index, handle.abort_handle());
        debug!(index, "Launched task");

        let live = Arc::clone(&self.live);
        let completion = async move {
            let status = match handle.await {
                Ok(Ok(())) => WorkerStatus::Exited(0),
                Ok(Err(e)) => {
                    info!(index, error = %e, "Task failed");
                    WorkerStatus::Exited(i32::from(e.exit_code()))
                }
                Err(e) if e.is_cancelled() => WorkerStatus::Aborted,
                Err(_) => WorkerStatus::Unknown,
            };
            live.remove(&index);
            WorkerExit {
                index,
                pid: None,
                status,
            }
        }
        .boxed();

        Ok(LaunchedWorker {
            pid: None,
            completion,
        })
    }

    fn terminate_all(&self) -> usize {
        let mut aborted = 0;
        for entry in self.live.iter() {
            entry.value().abort();
            aborted += 1;
        }
        aborted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use std::time::Duration;

    #[tokio::test]
    async fn test_status_mapping() {
        let backend = TaskBackend::new(|index| async move {
            match index {
                0 => Ok(()),
                1 => Err(BatchError::from(ConfigError::MissingValue('n'))),
                _ => panic!("boom"),
            }
        });

        let ok = backend.launch(0).unwrap().completion.await;
        let failed = backend.launch(1).unwrap().completion.await;
        let panicked = backend.launch(2).unwrap().completion.await;

        assert_eq!(ok.status, WorkerStatus::Exited(0));
        assert_eq!(failed.status, WorkerStatus::Exited(2));
        assert_eq!(panicked.status, WorkerStatus::Unknown);
        assert_eq!(backend.live_count(), 0);
    }

    #[tokio::test]
    async fn test_terminate_all_aborts_tasks() {
        let backend = TaskBackend::new(|_| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        });

        let worker = backend.launch(0).unwrap();
        assert_eq!(backend.terminate_all(), 1);
        assert_eq!(worker.completion.await.status, WorkerStatus::Aborted);
    }
}
