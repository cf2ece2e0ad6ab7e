/*!
 * Worker Module
 * The per-item execution unit and the output channels it writes
 */

pub mod output;
pub mod predicate;
pub mod state;
pub mod unit;

pub use output::{
    append_span, read_timeline, CriticalSpan, OutputChannels, ResultRecord, ACCEPTED_FILE,
    AUDIT_FILE, REJECTED_FILE,
};
pub use predicate::{is_symmetric, Predicate};
pub use state::WorkerState;
pub use unit::WorkerUnit;
