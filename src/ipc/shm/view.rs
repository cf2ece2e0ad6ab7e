/*!
 * Shared Workspace View
 * Read-only worker mapping of a published workspace
 */

use super::types::{
    read_u32, read_u64, segment_len, validate_key, WorkspaceError, COUNT_OFFSET, HEADER_LEN,
    LAYOUT_VERSION, MAGIC_OFFSET, START_OFFSET, VERSION_OFFSET, WORKSPACE_MAGIC,
};
use crate::core::limits::SLOT_WIDTH;
use crate::core::types::{ItemIndex, Timestamp};
use memmap2::Mmap;
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::mman::shm_open;
use nix::sys::stat::Mode;
use std::fs::File;
use tracing::debug;

/// Read-only view of a published workspace. Dropping it detaches.
pub struct WorkspaceView {
    key: String,
    map: Mmap,
    item_count: usize,
    start: Timestamp,
}

impl WorkspaceView {
    /// Map the segment behind `key` for reading.
    ///
    /// When `expected_count` is given the published count must match it.
    pub fn attach(key: &str, expected_count: Option<usize>) -> Result<Self, WorkspaceError> {
        validate_key(key)?;

        let fd = shm_open(key, OFlag::O_RDONLY, Mode::empty()).map_err(|errno| match errno {
            Errno::ENOENT => WorkspaceError::NotFound(key.to_string()),
            other => WorkspaceError::AttachFailure {
                key: key.to_string(),
                reason: other.desc().to_string(),
            },
        })?;
        let file = File::from(fd);

        // SAFETY: the mapping is read-only and the coordinator stops writing
        // once the segment is published, before any worker is launched.
        let map = unsafe { Mmap::map(&file) }.map_err(|e| WorkspaceError::AttachFailure {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        let attach_failure = |reason: &str| WorkspaceError::AttachFailure {
            key: key.to_string(),
            reason: reason.to_string(),
        };

        if map.len() < HEADER_LEN {
            return Err(attach_failure("segment smaller than header"));
        }
        if read_u32(&map, MAGIC_OFFSET) != WORKSPACE_MAGIC {
            return Err(attach_failure("workspace not published"));
        }
        if read_u32(&map, VERSION_OFFSET) != LAYOUT_VERSION {
            return Err(attach_failure("unsupported layout version"));
        }

        let item_count = usize::try_from(read_u64(&map, COUNT_OFFSET))
            .map_err(|_| attach_failure("item count does not fit usize"))?;
        match segment_len(item_count) {
            Some(len) if len <= map.len() => {}
            _ => return Err(attach_failure("segment smaller than its item count")),
        }
        if let Some(expected) = expected_count {
            if expected != item_count {
                return Err(WorkspaceError::CountMismatch {
                    expected,
                    actual: item_count,
                });
            }
        }

        let start = read_u64(&map, START_OFFSET);
        debug!(key, item_count, "Attached shared workspace");

        Ok(Self {
            key: key.to_string(),
            map,
            item_count,
            start,
        })
    }

    /// Bounds-checked slot access
    pub fn item(&self, index: ItemIndex) -> Result<&str, WorkspaceError> {
        if index >= self.item_count {
            return Err(WorkspaceError::IndexOutOfRange {
                index,
                len: self.item_count,
            });
        }
        let offset = HEADER_LEN + index * SLOT_WIDTH;
        let slot = &self.map[offset..offset + SLOT_WIDTH];
        let end = slot.iter().position(|&b| b == 0).unwrap_or(SLOT_WIDTH);
        std::str::from_utf8(&slot[..end]).map_err(|_| WorkspaceError::CorruptSlot(index))
    }

    /// Reference start time stamped by the coordinator
    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn len(&self) -> usize {
        self.item_count
    }

    pub fn is_empty(&self) -> bool {
        self.item_count == 0
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Debug for WorkspaceView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceView")
            .field("key", &self.key)
            .field("item_count", &self.item_count)
            .finish_non_exhaustive()
    }
}
