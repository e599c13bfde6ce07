//! Safety & cleanup
//!
//! Per-request workspace allocation and guaranteed, best-effort removal.

pub mod cleanup;
pub mod workspace;

pub use workspace::{Workspace, WorkspaceManager};
