/*!
 * Monotonic Clock
 * Host-wide monotonic time shared between the coordinator and its workers
 */

use super::types::Timestamp;
use nix::time::{clock_gettime, ClockId};
use std::io;

/// Current CLOCK_MONOTONIC reading in nanoseconds.
///
/// Unlike `std::time::Instant`, the raw value is meaningful in another
/// process on the same host, so workers can compute offsets against the
/// reference start the coordinator publishes.
pub fn monotonic_ns() -> io::Result<Timestamp> {
    let now = clock_gettime(ClockId::CLOCK_MONOTONIC).map_err(io::Error::from)?;
    let secs = u64::try_from(now.tv_sec()).unwrap_or(0);
    let nanos = u64::try_from(now.tv_nsec()).unwrap_or(0);
    Ok(secs.saturating_mul(1_000_000_000).saturating_add(nanos))
}

/// Microseconds elapsed since `start`, saturating at zero
pub fn offset_us(start: Timestamp) -> io::Result<u64> {
    Ok(monotonic_ns()?.saturating_sub(start) / 1_000)
}
