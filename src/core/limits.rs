/*!
 * Run Limits and Constants
 *
 * Centralized location for slot sizes, admission caps and default knobs.
 * Organized by domain (workspace, admission, timing).
 */

use std::time::Duration;

// =============================================================================
// WORKSPACE LAYOUT
// =============================================================================

/// Fixed width of one item slot in the shared workspace, NUL terminator included
pub const SLOT_WIDTH: usize = 128;

/// Longest item text that fits a slot; longer items are truncated
pub const MAX_ITEM_BYTES: usize = SLOT_WIDTH - 1;

/// Prefix for generated workspace keys (POSIX shm names start with '/')
pub const WORKSPACE_KEY_PREFIX: &str = "/batchgate-";

/// Longest POSIX shm name accepted on Linux (NAME_MAX)
pub const MAX_WORKSPACE_KEY_LEN: usize = 255;

// =============================================================================
// ADMISSION
// =============================================================================

/// Default total number of workers a run may ever launch (-n)
pub const DEFAULT_MAX_TOTAL: usize = 4;

/// Hard ceiling on -n; larger requests are clamped
pub const MAX_TOTAL_CAP: usize = 20;

/// Default number of simultaneously active workers (-s)
pub const DEFAULT_MAX_CONCURRENT: usize = 2;

// =============================================================================
// TIMING
// =============================================================================

/// Default hard deadline for the whole run (-t)
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(100);

/// Default lower bound of the in-critical-section contention delay
pub const DEFAULT_MIN_DELAY: Duration = Duration::ZERO;

/// Default upper bound of the in-critical-section contention delay
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(2000);
