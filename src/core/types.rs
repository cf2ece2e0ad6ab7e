/*!
 * Core Types
 * Common types used across the coordinator and workers
 */

use serde::{Deserialize, Serialize};

/// OS process ID type
pub type Pid = u32;

/// Position of an item within the published input sequence
pub type ItemIndex = usize;

/// Monotonic timestamp in nanoseconds (CLOCK_MONOTONIC, host-wide)
pub type Timestamp = u64;

/// Immutable input record plus its position in the input sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub index: ItemIndex,
    pub text: String,
}

impl WorkItem {
    pub fn new(index: ItemIndex, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }
}
