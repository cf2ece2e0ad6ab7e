/*!
 * Shared Workspace Module
 * Zero-copy hand-off of the published input from the coordinator to workers
 */

pub mod segment;
pub mod types;
pub mod view;

// Re-export public API
pub use segment::Workspace;
pub use types::{segment_len, WorkspaceError, HEADER_LEN};
pub use view::WorkspaceView;
