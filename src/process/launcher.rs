/*!
 * Bounded Launcher
 *
 * Admits execution units in input order while at most `cap` are active,
 * reaps them in whatever order they finish, and stops admitting once the
 * launch budget is spent or the deadline controller trips.
 */

use super::backend::LaunchBackend;
use super::budget::RunBudget;
use super::types::{RunReport, WorkerExit};
use crate::config::ConfigError;
use crate::core::errors::BatchError;
use crate::signals::DeadlineController;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Admission/reap loop generic over the execution backend
pub struct BoundedLauncher<B: LaunchBackend> {
    backend: B,
    controller: Arc<DeadlineController>,
    cap: usize,
}

/// Per-run state of the admission/reap loop
struct Reaper {
    running: FuturesUnordered<BoxFuture<'static, WorkerExit>>,
    succeeded: usize,
    failed: usize,
    terminated: bool,
}

impl<B: LaunchBackend> BoundedLauncher<B> {
    /// `cap` is the concurrency limit; zero is rejected before anything runs
    pub fn new(
        backend: B,
        controller: Arc<DeadlineController>,
        cap: usize,
    ) -> Result<Self, ConfigError> {
        if cap == 0 {
            return Err(ConfigError::InvalidConcurrency(0));
        }
        Ok(Self {
            backend,
            controller,
            cap,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn controller(&self) -> &Arc<DeadlineController> {
        &self.controller
    }

    /// Launch up to `min(total_budget, item_count)` units, never more than
    /// `cap` at once, and wait for all of them.
    ///
    /// Unit failures are logged and counted, never fatal to the run. A trip
    /// of the controller terminates every live unit and stops admission;
    /// the returned report carries the cause.
    pub async fn run(&self, item_count: usize, total_budget: usize) -> Result<RunReport, BatchError> {
        let started = Instant::now();
        let mut budget = RunBudget::new(self.cap, item_count, total_budget)?;
        let mut reaper = Reaper {
            running: FuturesUnordered::new(),
            succeeded: 0,
            failed: 0,
            terminated: false,
        };

        info!(
            item_count,
            limit = budget.limit(),
            cap = self.cap,
            "Starting bounded launch"
        );

        for index in 0..budget.limit() {
            if !self.controller.try_admit() {
                debug!(index, "Admission closed");
                break;
            }

            match self.backend.launch(index) {
                Ok(worker) => {
                    budget.on_launch();
                    debug!(index, pid = worker.pid, active = budget.active(), "Admitted");
                    reaper.running.push(worker.completion);
                }
                Err(e) => {
                    error!(index, error = %e, "Failed to launch worker");
                    reaper.failed += 1;
                }
            }

            while budget.is_saturated() {
                if !self.reap_one(&mut reaper, &mut budget).await {
                    break;
                }
            }
        }

        while self.reap_one(&mut reaper, &mut budget).await {}

        let report = RunReport {
            item_count,
            limit: budget.limit(),
            launched: budget.launched(),
            succeeded: reaper.succeeded,
            failed: reaper.failed,
            peak_active: budget.peak_active(),
            trip: self.controller.cause(),
            elapsed: started.elapsed(),
        };

        info!(
            launched = report.launched,
            succeeded = report.succeeded,
            failed = report.failed,
            peak_active = report.peak_active,
            "Bounded launch finished"
        );
        Ok(report)
    }

    /// Wait for one unit to finish. Returns false when nothing is running.
    async fn reap_one(&self, reaper: &mut Reaper, budget: &mut RunBudget) -> bool {
        loop {
            let exit = tokio::select! {
                biased;
                cause = self.controller.tripped(), if !reaper.terminated => {
                    reaper.terminated = true;
                    let signalled = self.backend.terminate_all();
                    warn!(%cause, signalled, "Terminating worker group");
                    continue;
                }
                next = reaper.running.next() => match next {
                    Some(exit) => exit,
                    None => return false,
                },
            };

            budget.on_reap();
            if exit.status.success() {
                debug!(index = exit.index, pid = exit.pid, "Reaped worker");
                reaper.succeeded += 1;
            } else {
                let err = BatchError::WorkerExit {
                    pid: exit.pid,
                    index: exit.index,
                    status: exit.status,
                };
                if reaper.terminated {
                    warn!(pid = exit.pid, error = %err, "Worker stopped by abort");
                } else {
                    error!(pid = exit.pid, error = %err, "Worker failed");
                }
                reaper.failed += 1;
            }
            return true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::TaskBackend;

    fn launcher(cap: usize, budget: usize) -> BoundedLauncher<TaskBackend> {
        let backend = TaskBackend::new(|_| async { Ok(()) });
        BoundedLauncher::new(backend, Arc::new(DeadlineController::new(budget)), cap).unwrap()
    }

    #[test]
    fn test_zero_cap_rejected() {
        let backend = TaskBackend::new(|_| async { Ok(()) });
        let result = BoundedLauncher::new(backend, Arc::new(DeadlineController::new(4)), 0);
        assert!(matches!(result, Err(ConfigError::InvalidConcurrency(0))));
    }

    #[tokio::test]
    async fn test_budget_limits_launches() {
        let report = launcher(2, 4).run(5, 4).await.unwrap();
        assert_eq!(report.launched, 4);
        assert_eq!(report.succeeded, 4);
        assert!(report.completed());
        assert!(report.peak_active <= 2);
    }

    #[tokio::test]
    async fn test_zero_budget_launches_nothing() {
        let report = launcher(2, 0).run(5, 0).await.unwrap();
        assert_eq!(report.launched, 0);
        assert_eq!(report.limit, 0);
        assert!(report.completed());
    }

    #[tokio::test]
    async fn test_tripped_controller_admits_nothing() {
        let launcher = launcher(2, 5);
        launcher.controller().trip(crate::signals::TripCause::Manual);
        let report = launcher.run(5, 5).await.unwrap();
        assert_eq!(report.launched, 0);
        assert_eq!(report.trip, Some(crate::signals::TripCause::Manual));
    }
}
