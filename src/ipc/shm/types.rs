/*!
 * Shared Workspace Types
 * Segment layout, constants, and errors for the shared workspace
 */

use crate::core::limits::{MAX_WORKSPACE_KEY_LEN, SLOT_WIDTH};
use miette::Diagnostic;
use std::io;
use thiserror::Error;

/// "BGWS", written last during publish so a half-filled segment never validates
pub const WORKSPACE_MAGIC: u32 = 0x4247_5753;
pub const LAYOUT_VERSION: u32 = 1;

// Header field offsets
pub(super) const MAGIC_OFFSET: usize = 0;
pub(super) const VERSION_OFFSET: usize = 4;
pub(super) const COUNT_OFFSET: usize = 8;
pub(super) const START_OFFSET: usize = 16;
pub const HEADER_LEN: usize = 24;

/// Shared workspace error types
#[derive(Debug, Error, Diagnostic)]
pub enum WorkspaceError {
    /// Key is not a valid POSIX shared memory name
    #[error("Invalid workspace key '{0}'")]
    #[diagnostic(
        code(workspace::invalid_key),
        help("Keys start with '/' and contain no other '/' (at most 255 bytes).")
    )]
    InvalidKey(String),

    /// A segment with this key already exists
    #[error("Workspace {0} already exists")]
    #[diagnostic(
        code(workspace::already_exists),
        help("A previous run may have crashed; remove /dev/shm{0} or choose another key.")
    )]
    AlreadyExists(String),

    /// Allocation of the segment could not be satisfied
    #[error("Workspace {key}: {operation} failed: {source}")]
    #[diagnostic(
        code(workspace::resource_exhausted),
        help("The host may be out of shared memory. Check /dev/shm usage.")
    )]
    ResourceExhausted {
        key: String,
        operation: &'static str,
        #[source]
        source: io::Error,
    },

    /// Key does not resolve to an existing segment
    #[error("Workspace {0} not found")]
    #[diagnostic(
        code(workspace::not_found),
        help("The coordinator may have already torn the workspace down.")
    )]
    NotFound(String),

    /// Segment exists but cannot be mapped or fails validation
    #[error("Failed to attach workspace {key}: {reason}")]
    #[diagnostic(code(workspace::attach_failure))]
    AttachFailure { key: String, reason: String },

    /// Published item count differs from the segment capacity
    #[error("Item count mismatch: expected {expected}, got {actual}")]
    #[diagnostic(code(workspace::count_mismatch))]
    CountMismatch { expected: usize, actual: usize },

    /// Slot index outside the published sequence
    #[error("Item index {index} out of range for {len} items")]
    #[diagnostic(code(workspace::index_out_of_range))]
    IndexOutOfRange { index: usize, len: usize },

    /// Slot does not hold valid UTF-8 text
    #[error("Slot {0} does not contain valid UTF-8")]
    #[diagnostic(code(workspace::corrupt_slot))]
    CorruptSlot(usize),

    /// Unlinking the segment failed
    #[error("Failed to destroy workspace {key}: {source}")]
    #[diagnostic(code(workspace::destroy_failed))]
    DestroyFailed {
        key: String,
        #[source]
        source: io::Error,
    },
}

/// Validate a POSIX shm name
pub fn validate_key(key: &str) -> Result<(), WorkspaceError> {
    let valid = key.len() > 1
        && key.len() <= MAX_WORKSPACE_KEY_LEN
        && key.starts_with('/')
        && !key[1..].contains('/')
        && !key.contains('\0');
    if valid {
        Ok(())
    } else {
        Err(WorkspaceError::InvalidKey(key.to_string()))
    }
}

/// Exact segment size for `item_count` slots, or `None` on overflow
pub fn segment_len(item_count: usize) -> Option<usize> {
    item_count
        .checked_mul(SLOT_WIDTH)
        .and_then(|slots| slots.checked_add(HEADER_LEN))
}

pub(super) fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_ne_bytes(buf)
}

pub(super) fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_ne_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("/batchgate-1").is_ok());
        assert!(validate_key("batchgate").is_err());
        assert!(validate_key("/").is_err());
        assert!(validate_key("/a/b").is_err());
        assert!(validate_key(&format!("/{}", "k".repeat(300))).is_err());
    }

    #[test]
    fn test_segment_len() {
        assert_eq!(segment_len(0), Some(HEADER_LEN));
        assert_eq!(segment_len(3), Some(HEADER_LEN + 3 * SLOT_WIDTH));
        assert_eq!(segment_len(usize::MAX), None);
    }
}
