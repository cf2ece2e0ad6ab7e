/*!
 * Process Module
 * Worker launching, admission budgeting, and reaping
 */

pub mod backend;
pub mod budget;
pub mod executor;
pub mod launcher;
pub mod task;
pub mod types;

// Re-export for convenience
pub use backend::{LaunchBackend, LaunchedWorker};
pub use budget::RunBudget;
pub use executor::ProcessBackend;
pub use launcher::BoundedLauncher;
pub use task::{TaskBackend, TaskJob};
pub use types::{RunReport, WorkerExit, WorkerStatus};
