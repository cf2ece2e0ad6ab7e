/*!
 * Bounded Launcher Tests
 * Admission, reaping and abort behavior driven through in-process tasks
 */

use batchgate::core::errors::BatchError;
use batchgate::input::parse_items;
use batchgate::process::{LaunchBackend, LaunchedWorker, WorkerStatus};
use batchgate::{
    is_symmetric, BoundedLauncher, ConfigError, DeadlineController, ItemIndex, OutputChannels,
    TaskBackend, TripCause,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::tempdir;

/// Task backend whose jobs track how many of them run at once
fn counting_backend(hold: Duration) -> (TaskBackend, Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (c, p) = (Arc::clone(&current), Arc::clone(&peak));
    let backend = TaskBackend::new(move |_| {
        let (current, peak) = (Arc::clone(&c), Arc::clone(&p));
        async move {
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(hold).await;
            current.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    });
    (backend, current, peak)
}

fn controller(budget: usize) -> Arc<DeadlineController> {
    Arc::new(DeadlineController::new(budget))
}

#[tokio::test]
async fn test_active_never_exceeds_cap() {
    for cap in 1..=4 {
        let (backend, current, peak) = counting_backend(Duration::from_millis(15));
        let launcher = BoundedLauncher::new(backend, controller(10), cap).unwrap();

        let report = launcher.run(10, 10).await.unwrap();

        assert_eq!(report.launched, 10);
        assert_eq!(report.succeeded, 10);
        assert!(peak.load(Ordering::SeqCst) <= cap, "cap {} exceeded", cap);
        assert!(report.peak_active <= cap);
        assert_eq!(current.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn test_five_items_budget_four_launches_four() {
    let dir = tempdir().unwrap();
    let items: Arc<[_]> = parse_items("racecar\nhello\nlevel\nabc\nnoon\n").into();
    let channels = Arc::new(Mutex::new(OutputChannels::new(dir.path())));
    let backend = TaskBackend::evaluating(Arc::clone(&items), is_symmetric, Arc::clone(&channels));

    let launcher = BoundedLauncher::new(backend, controller(4), 2).unwrap();
    let report = launcher.run(items.len(), 4).await.unwrap();

    assert_eq!(report.launched, 4);
    assert!(report.completed());

    let audit = std::fs::read_to_string(dir.path().join("output.log")).unwrap();
    assert_eq!(audit.lines().count(), 4);
    assert!(!audit.contains("noon"));

    let mut accepted: Vec<_> = std::fs::read_to_string(dir.path().join("palin.out"))
        .unwrap()
        .lines()
        .map(str::to_owned)
        .collect();
    accepted.sort();
    assert_eq!(accepted, vec!["level", "racecar"]);
}

#[tokio::test]
async fn test_zero_cap_is_config_error() {
    let (backend, _, _) = counting_backend(Duration::ZERO);
    let result = BoundedLauncher::new(backend, controller(4), 0);
    assert!(matches!(result, Err(ConfigError::InvalidConcurrency(0))));
}

#[tokio::test]
async fn test_zero_budget_completes_immediately() {
    let (backend, _, peak) = counting_backend(Duration::from_secs(10));
    let launcher = BoundedLauncher::new(backend, controller(0), 2).unwrap();

    let report = launcher.run(5, 0).await.unwrap();

    assert_eq!(report.launched, 0);
    assert_eq!(report.succeeded, 0);
    assert_eq!(peak.load(Ordering::SeqCst), 0);
    assert!(report.elapsed < Duration::from_secs(1));
}

#[tokio::test]
async fn test_failed_units_do_not_stop_the_run() {
    let backend = TaskBackend::new(|index| async move {
        if index % 2 == 1 {
            Err(BatchError::from(ConfigError::MissingValue('x')))
        } else {
            Ok(())
        }
    });
    let launcher = BoundedLauncher::new(backend, controller(6), 2).unwrap();

    let report = launcher.run(6, 6).await.unwrap();

    assert_eq!(report.launched, 6);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed, 3);
    assert!(report.trip.is_none());
}

/// Refuses to start every other unit
struct FlakyBackend(TaskBackend);

impl LaunchBackend for FlakyBackend {
    fn launch(&self, index: ItemIndex) -> Result<LaunchedWorker, BatchError> {
        if index % 2 == 0 {
            return Err(BatchError::io(
                "spawn worker",
                std::io::Error::new(std::io::ErrorKind::Other, "no slots"),
            ));
        }
        self.0.launch(index)
    }

    fn terminate_all(&self) -> usize {
        self.0.terminate_all()
    }
}

#[tokio::test]
async fn test_launch_failure_counted_not_relaunched() {
    let backend = FlakyBackend(TaskBackend::new(|_| async { Ok(()) }));
    let launcher = BoundedLauncher::new(backend, controller(4), 1).unwrap();

    let report = launcher.run(4, 4).await.unwrap();

    assert_eq!(report.launched, 2);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 2);
}

#[tokio::test]
async fn test_deadline_aborts_running_units() {
    let (backend, current, _) = counting_backend(Duration::from_secs(30));
    let controller = controller(5);
    let armed = controller.arm(Duration::from_millis(200)).unwrap();
    let launcher = BoundedLauncher::new(backend, Arc::clone(&controller), 2).unwrap();

    let started = Instant::now();
    let report = launcher.run(5, 5).await.unwrap();
    armed.disarm();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(report.launched, 2);
    assert_eq!(report.failed, 2);
    assert_eq!(report.succeeded, 0);
    assert!(matches!(report.trip, Some(TripCause::Deadline(_))));
    assert_eq!(controller.remaining(), 0);
    // Aborted jobs never reach their decrement
    assert_eq!(current.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_manual_trip_mid_run() {
    let backend = TaskBackend::new(|_| async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    });
    let controller = controller(3);
    let launcher = BoundedLauncher::new(backend, Arc::clone(&controller), 3).unwrap();

    let tripper = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            controller.trip(TripCause::Manual)
        })
    };

    let report = launcher.run(3, 3).await.unwrap();
    assert!(tripper.await.unwrap());
    assert_eq!(report.trip, Some(TripCause::Manual));
    assert_eq!(report.launched, 3);
    assert_eq!(launcher.backend().live_count(), 0);
    assert!(!report.completed());
    assert_eq!(WorkerStatus::Aborted.to_string(), "was aborted");
}
