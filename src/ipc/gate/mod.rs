/*!
 * Gate Module
 * Cross-process mutual exclusion for the workers' critical section
 */

#[allow(clippy::module_inception)]
pub mod gate;
pub mod types;

pub use gate::{Gate, GateGuard};
pub use types::GateError;
