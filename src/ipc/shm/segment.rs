/*!
 * Shared Workspace Segment
 * Coordinator-owned POSIX shared memory segment holding the published items
 */

use super::types::{
    segment_len, validate_key, WorkspaceError, COUNT_OFFSET, HEADER_LEN, LAYOUT_VERSION,
    MAGIC_OFFSET, START_OFFSET, VERSION_OFFSET, WORKSPACE_MAGIC,
};
use crate::core::limits::{MAX_ITEM_BYTES, SLOT_WIDTH};
use crate::core::types::{Timestamp, WorkItem};
use memmap2::MmapMut;
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::mman::{shm_open, shm_unlink};
use nix::sys::stat::Mode;
use std::fs::File;
use std::io;
use tracing::{debug, info, warn};

/// Owner handle for the shared workspace.
///
/// Only the coordinator holds one. `destroy` consumes the handle, so the
/// segment is unlinked exactly once; a handle dropped without `destroy`
/// (early return, panic) still unlinks in `Drop`.
pub struct Workspace {
    key: String,
    item_count: usize,
    map: Option<MmapMut>,
    unlinked: bool,
}

impl Workspace {
    /// Allocate a segment sized exactly for `item_count` slots plus the header
    pub fn create(key: &str, item_count: usize) -> Result<Self, WorkspaceError> {
        validate_key(key)?;

        let len = segment_len(item_count).ok_or_else(|| WorkspaceError::ResourceExhausted {
            key: key.to_string(),
            operation: "size",
            source: io::Error::new(io::ErrorKind::OutOfMemory, "segment size overflows"),
        })?;

        let fd = shm_open(
            key,
            OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR,
            Mode::S_IRUSR | Mode::S_IWUSR,
        )
        .map_err(|errno| match errno {
            Errno::EEXIST => WorkspaceError::AlreadyExists(key.to_string()),
            other => WorkspaceError::ResourceExhausted {
                key: key.to_string(),
                operation: "shm_open",
                source: other.into(),
            },
        })?;
        let file = File::from(fd);

        let map = match Self::size_and_map(&file, len) {
            Ok(map) => map,
            Err((operation, source)) => {
                if let Err(errno) = shm_unlink(key) {
                    warn!(key, error = %errno, "Failed to unlink half-created workspace");
                }
                return Err(WorkspaceError::ResourceExhausted {
                    key: key.to_string(),
                    operation,
                    source,
                });
            }
        };

        let mut workspace = Self {
            key: key.to_string(),
            item_count,
            map: Some(map),
            unlinked: false,
        };
        workspace.write_at(VERSION_OFFSET, &LAYOUT_VERSION.to_ne_bytes());
        workspace.write_at(COUNT_OFFSET, &(item_count as u64).to_ne_bytes());

        info!(key, item_count, bytes = len, "Created shared workspace");
        Ok(workspace)
    }

    fn size_and_map(file: &File, len: usize) -> Result<MmapMut, (&'static str, io::Error)> {
        file.set_len(len as u64).map_err(|e| ("ftruncate", e))?;
        // SAFETY: the segment was created with O_EXCL by this process and is not
        // visible to workers until its key is handed out after publish, so no
        // other mapping mutates it while this mutable view exists.
        unsafe { MmapMut::map_mut(file) }.map_err(|e| ("mmap", e))
    }

    fn write_at(&mut self, offset: usize, bytes: &[u8]) {
        if let Some(map) = self.map.as_mut() {
            map[offset..offset + bytes.len()].copy_from_slice(bytes);
        }
    }

    /// Write every item into its slot and stamp the reference start time.
    ///
    /// Items longer than a slot are truncated at a UTF-8 boundary, and items
    /// with an interior NUL keep only the text before it. Returns the number
    /// of truncated items.
    pub fn publish(&mut self, items: &[WorkItem], start: Timestamp) -> Result<usize, WorkspaceError> {
        if items.len() != self.item_count {
            return Err(WorkspaceError::CountMismatch {
                expected: self.item_count,
                actual: items.len(),
            });
        }
        let Some(map) = self.map.as_mut() else {
            return Err(WorkspaceError::NotFound(self.key.clone()));
        };

        let mut truncated = 0;
        for (slot, item) in items.iter().enumerate() {
            let bytes = truncate_to_slot(&item.text);
            if bytes.len() < item.text.len() {
                warn!(
                    index = item.index,
                    len = item.text.len(),
                    max = MAX_ITEM_BYTES,
                    "Item does not fit its slot, truncated"
                );
                truncated += 1;
            }
            let offset = HEADER_LEN + slot * SLOT_WIDTH;
            let dst = &mut map[offset..offset + SLOT_WIDTH];
            dst.fill(0);
            dst[..bytes.len()].copy_from_slice(bytes);
        }

        map[START_OFFSET..START_OFFSET + 8].copy_from_slice(&start.to_ne_bytes());
        map[MAGIC_OFFSET..MAGIC_OFFSET + 4].copy_from_slice(&WORKSPACE_MAGIC.to_ne_bytes());

        debug!(key = %self.key, items = items.len(), truncated, "Published workspace");
        Ok(truncated)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// Unmap and unlink the segment. Views still attached elsewhere keep their
    /// mapping, but the key no longer resolves.
    pub fn destroy(mut self) -> Result<(), WorkspaceError> {
        self.map.take();
        self.unlinked = true;
        shm_unlink(self.key.as_str()).map_err(|errno| WorkspaceError::DestroyFailed {
            key: self.key.clone(),
            source: errno.into(),
        })?;
        info!(key = %self.key, "Destroyed shared workspace");
        Ok(())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.unlinked {
            return;
        }
        self.map.take();
        match shm_unlink(self.key.as_str()) {
            Ok(()) => warn!(key = %self.key, "Workspace dropped without destroy, unlinked"),
            Err(errno) => warn!(key = %self.key, error = %errno, "Failed to unlink dropped workspace"),
        }
    }
}

/// Longest prefix of `text` that fits a slot without splitting a character.
/// Slots are NUL-terminated, so the prefix also stops at the first NUL.
pub(crate) fn truncate_to_slot(text: &str) -> &[u8] {
    let text = match text.find('\0') {
        Some(nul) => &text[..nul],
        None => text,
    };
    if text.len() <= MAX_ITEM_BYTES {
        return text.as_bytes();
    }
    let mut end = MAX_ITEM_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text.as_bytes()[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::shm::WorkspaceView;

    fn unique_key(tag: &str) -> String {
        format!("/batchgate-unit-{}-{}", tag, uuid::Uuid::new_v4().simple())
    }

    fn items(texts: &[&str]) -> Vec<WorkItem> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| WorkItem::new(i, *t))
            .collect()
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let ascii = "a".repeat(200);
        assert_eq!(truncate_to_slot(&ascii).len(), MAX_ITEM_BYTES);

        // 'é' is two bytes; 64 of them straddle the 127-byte limit
        let wide = "é".repeat(64);
        let cut = truncate_to_slot(&wide);
        assert_eq!(cut.len(), 126);
        assert!(std::str::from_utf8(cut).is_ok());

        assert_eq!(truncate_to_slot("short"), b"short");
    }

    #[test]
    fn test_interior_nul_counts_as_truncated() {
        assert_eq!(truncate_to_slot("ab\0cd"), b"ab");

        let key = unique_key("nul");
        let mut ws = Workspace::create(&key, 2).unwrap();
        assert_eq!(ws.publish(&items(&["ab\0cd", "level"]), 0).unwrap(), 1);

        let view = WorkspaceView::attach(&key, Some(2)).unwrap();
        assert_eq!(view.item(0).unwrap(), "ab");
        assert_eq!(view.item(1).unwrap(), "level");
        drop(view);
        ws.destroy().unwrap();
    }

    #[test]
    fn test_create_publish_attach_destroy() {
        let key = unique_key("lifecycle");
        let mut ws = Workspace::create(&key, 3).unwrap();
        assert_eq!(ws.publish(&items(&["racecar", "hello", ""]), 1234).unwrap(), 0);

        let view = WorkspaceView::attach(&key, Some(3)).unwrap();
        assert_eq!(view.len(), 3);
        assert_eq!(view.start(), 1234);
        assert_eq!(view.item(0).unwrap(), "racecar");
        assert_eq!(view.item(1).unwrap(), "hello");
        assert_eq!(view.item(2).unwrap(), "");
        drop(view);

        ws.destroy().unwrap();
        assert!(matches!(
            WorkspaceView::attach(&key, None),
            Err(WorkspaceError::NotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let key = unique_key("dup");
        let ws = Workspace::create(&key, 1).unwrap();
        assert!(matches!(
            Workspace::create(&key, 1),
            Err(WorkspaceError::AlreadyExists(_))
        ));
        ws.destroy().unwrap();
    }

    #[test]
    fn test_publish_count_mismatch() {
        let key = unique_key("mismatch");
        let mut ws = Workspace::create(&key, 2).unwrap();
        assert!(matches!(
            ws.publish(&items(&["only one"]), 0),
            Err(WorkspaceError::CountMismatch { expected: 2, actual: 1 })
        ));
        ws.destroy().unwrap();
    }

    #[test]
    fn test_unpublished_workspace_does_not_attach() {
        let key = unique_key("unpublished");
        let ws = Workspace::create(&key, 1).unwrap();
        assert!(matches!(
            WorkspaceView::attach(&key, Some(1)),
            Err(WorkspaceError::AttachFailure { .. })
        ));
        ws.destroy().unwrap();
    }

    #[test]
    fn test_drop_without_destroy_unlinks() {
        let key = unique_key("drop");
        {
            let mut ws = Workspace::create(&key, 1).unwrap();
            ws.publish(&items(&["x"]), 0).unwrap();
        }
        assert!(matches!(
            WorkspaceView::attach(&key, None),
            Err(WorkspaceError::NotFound(_))
        ));
    }

    #[test]
    fn test_empty_workspace() {
        let key = unique_key("empty");
        let mut ws = Workspace::create(&key, 0).unwrap();
        ws.publish(&[], 0).unwrap();
        let view = WorkspaceView::attach(&key, Some(0)).unwrap();
        assert!(view.is_empty());
        assert!(matches!(
            view.item(0),
            Err(WorkspaceError::IndexOutOfRange { index: 0, len: 0 })
        ));
        ws.destroy().unwrap();
    }
}
