/*!
 * Signal Types
 */

use std::fmt;
use std::time::Duration;

/// Why a run was aborted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripCause {
    /// The armed deadline expired
    Deadline(Duration),
    /// An external interrupt arrived (signal name)
    Interrupt(&'static str),
    /// Aborted programmatically
    Manual,
}

impl fmt::Display for TripCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TripCause::Deadline(d) => write!(f, "deadline of {:.3}s exceeded", d.as_secs_f64()),
            TripCause::Interrupt(signal) => write!(f, "interrupted by {}", signal),
            TripCause::Manual => write!(f, "aborted"),
        }
    }
}
