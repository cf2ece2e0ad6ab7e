/*!
 * Signals Module
 * Deadline timer and interrupt handling for the coordinator
 */

pub mod deadline;
pub mod types;

pub use deadline::{ArmedDeadline, DeadlineController};
pub use types::TripCause;
