/*!
 * Deadline / Interrupt Controller
 *
 * Owns the run's remaining launch budget and the abort latch. The timer task
 * and the SIGINT/SIGTERM listener trip the latch; the launcher polls
 * `try_admit` before each launch and races its reaping against `tripped`.
 */

use super::types::TripCause;
use crate::core::errors::BatchError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Shared abort latch plus remaining launch budget
#[derive(Debug)]
pub struct DeadlineController {
    remaining: AtomicUsize,
    cause: Mutex<Option<TripCause>>,
    notify: Notify,
}

impl DeadlineController {
    /// Create a controller allowing at most `budget` further launches
    pub fn new(budget: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(budget),
            cause: Mutex::new(None),
            notify: Notify::new(),
        }
    }

    /// Launches still allowed
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Consume one unit of launch budget. False once the budget is spent or
    /// the controller has tripped.
    pub fn try_admit(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Abort the run. Idempotent; the first cause wins. Returns true for the
    /// call that actually tripped the latch.
    pub fn trip(&self, cause: TripCause) -> bool {
        let mut slot = self.cause.lock();
        self.remaining.store(0, Ordering::Release);
        if slot.is_some() {
            return false;
        }
        *slot = Some(cause);
        drop(slot);

        warn!(%cause, "Run tripped, no further workers will be admitted");
        self.notify.notify_waiters();
        true
    }

    pub fn is_tripped(&self) -> bool {
        self.cause.lock().is_some()
    }

    pub fn cause(&self) -> Option<TripCause> {
        *self.cause.lock()
    }

    /// Resolve once the controller has tripped
    pub async fn tripped(&self) -> TripCause {
        loop {
            // Registered before the check so a concurrent trip is not missed
            let notified = self.notify.notified();
            if let Some(cause) = self.cause() {
                return cause;
            }
            notified.await;
        }
    }

    /// Schedule the one-shot deadline and install the interrupt listeners.
    ///
    /// Must be called from within a Tokio runtime. Failing to install a
    /// handler is fatal to the run. The returned guard disarms on drop.
    pub fn arm(self: &Arc<Self>, deadline: Duration) -> Result<ArmedDeadline, BatchError> {
        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|e| BatchError::io("install SIGINT handler", e))?;
        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| BatchError::io("install SIGTERM handler", e))?;

        let timer = {
            let controller = Arc::clone(self);
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                controller.trip(TripCause::Deadline(deadline));
            })
        };

        let listener = {
            let controller = Arc::clone(self);
            tokio::spawn(async move {
                // Keep listening after the first trip so repeated interrupts
                // stay absorbed while cleanup runs
                loop {
                    let name = tokio::select! {
                        Some(()) = sigint.recv() => "SIGINT",
                        Some(()) = sigterm.recv() => "SIGTERM",
                        else => break,
                    };
                    controller.trip(TripCause::Interrupt(name));
                }
            })
        };

        info!(deadline_secs = deadline.as_secs_f64(), "Deadline armed");
        Ok(ArmedDeadline {
            handles: vec![timer, listener],
        })
    }
}

/// Keeps the timer and listener tasks alive; aborts them when dropped
#[derive(Debug)]
pub struct ArmedDeadline {
    handles: Vec<JoinHandle<()>>,
}

impl ArmedDeadline {
    pub fn disarm(self) {
        drop(self);
    }
}

impl Drop for ArmedDeadline {
    fn drop(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_consumes_budget() {
        let controller = DeadlineController::new(2);
        assert!(controller.try_admit());
        assert!(controller.try_admit());
        assert!(!controller.try_admit());
        assert_eq!(controller.remaining(), 0);
    }

    #[test]
    fn test_trip_is_idempotent_and_zeroes_budget() {
        let controller = DeadlineController::new(10);
        assert!(controller.trip(TripCause::Manual));
        assert!(!controller.trip(TripCause::Interrupt("SIGINT")));
        assert_eq!(controller.cause(), Some(TripCause::Manual));
        assert_eq!(controller.remaining(), 0);
        assert!(!controller.try_admit());
    }

    #[tokio::test]
    async fn test_tripped_wakes_waiter() {
        let controller = Arc::new(DeadlineController::new(1));
        let waiter = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.tripped().await })
        };
        tokio::task::yield_now().await;
        controller.trip(TripCause::Manual);
        assert_eq!(waiter.await.unwrap(), TripCause::Manual);
    }

    #[tokio::test]
    async fn test_armed_deadline_fires() {
        let controller = Arc::new(DeadlineController::new(5));
        let _armed = controller.arm(Duration::from_millis(50)).unwrap();

        let cause = tokio::time::timeout(Duration::from_secs(5), controller.tripped())
            .await
            .unwrap();
        assert_eq!(cause, TripCause::Deadline(Duration::from_millis(50)));
        assert_eq!(controller.remaining(), 0);
    }

    #[tokio::test]
    async fn test_disarmed_deadline_never_fires() {
        let controller = Arc::new(DeadlineController::new(5));
        controller.arm(Duration::from_millis(20)).unwrap().disarm();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!controller.is_tripped());
        assert_eq!(controller.remaining(), 5);
    }
}
