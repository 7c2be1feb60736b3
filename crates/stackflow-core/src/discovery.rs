//! Project root discovery
//!
//! A project root is a directory holding `stack.kdl`, either directly or
//! under `.stackflow/`.

use crate::error::{Result, StackError};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the stack declaration file
pub const STACK_FILE: &str = "stack.kdl";

/// Directory holding generated engine workspaces (and optionally the stack file)
pub const STACKFLOW_DIR: &str = ".stackflow";

/// Locate the stack file inside a project root
///
/// `stack.kdl` wins over `.stackflow/stack.kdl` when both exist.
pub fn stack_file(project_root: &Path) -> Option<PathBuf> {
    let direct = project_root.join(STACK_FILE);
    if direct.is_file() {
        return Some(direct);
    }

    let nested = project_root.join(STACKFLOW_DIR).join(STACK_FILE);
    if nested.is_file() {
        return Some(nested);
    }

    None
}

/// Walk up from `start` until a directory with a stack file is found
#[tracing::instrument(fields(start = %start.display()))]
pub fn find_project_root(start: &Path) -> Result<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        debug!(checking = %current.display(), "Looking for stack.kdl");
        if let Some(file) = stack_file(&current) {
            info!(project_root = %current.display(), file = %file.display(), "Found project root");
            return Ok(current);
        }

        if !current.pop() {
            break;
        }
    }

    warn!(start = %start.display(), "Project root not found");
    Err(StackError::ProjectRootNotFound(start.to_path_buf()))
}
