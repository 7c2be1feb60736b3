//! Project loader
//!
//! Combines discovery, parsing and user-data resolution.

use crate::declaration::minimal_web_stack;
use crate::discovery::{find_project_root, stack_file};
use crate::error::{Result, StackError};
use crate::model::{ResourceKind, Stack, UserData};
use crate::parser::parse_kdl_string;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Where a loaded stack came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackSource {
    /// Parsed from a stack file
    File(PathBuf),
    /// No stack file was found; the built-in declaration was used
    Builtin,
}

impl fmt::Display for StackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackSource::File(path) => write!(f, "{}", path.display()),
            StackSource::Builtin => write!(f, "built-in minimal-web"),
        }
    }
}

/// Load the stack declared under `project_root`
///
/// The project name defaults to the root directory name. `user-data-file`
/// paths are read relative to the root and inlined.
#[instrument(fields(project_root = %project_root.display()))]
pub fn load_project_from_root(project_root: &Path) -> Result<Stack> {
    let file = stack_file(project_root)
        .ok_or_else(|| StackError::ProjectRootNotFound(project_root.to_path_buf()))?;

    let content = std::fs::read_to_string(&file).map_err(|e| StackError::IoError {
        path: file.clone(),
        message: e.to_string(),
    })?;

    let name = project_root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();

    let mut stack = parse_kdl_string(&content, name)?;
    resolve_user_data(&mut stack, project_root)?;

    info!(
        project = %stack.name,
        resources = stack.resources.len(),
        outputs = stack.outputs.len(),
        "Project loaded"
    );
    Ok(stack)
}

/// A stack together with where it was found
#[derive(Debug, Clone)]
pub struct LoadedStack {
    pub stack: Stack,
    pub source: StackSource,
    /// Directory the engine workspace is created under
    pub project_root: PathBuf,
}

/// Load the project containing `start`, or the built-in stack when there is none
///
/// With the built-in stack, `start` itself serves as the project root.
#[instrument(fields(start = %start.display()))]
pub fn load_or_builtin(start: &Path) -> Result<LoadedStack> {
    match find_project_root(start) {
        Ok(root) => {
            let stack = load_project_from_root(&root)?;
            let file = stack_file(&root).unwrap_or_else(|| root.join(crate::STACK_FILE));
            Ok(LoadedStack {
                stack,
                source: StackSource::File(file),
                project_root: root,
            })
        }
        Err(StackError::ProjectRootNotFound(_)) => {
            info!("No stack file found, using built-in declaration");
            Ok(LoadedStack {
                stack: minimal_web_stack(),
                source: StackSource::Builtin,
                project_root: start.to_path_buf(),
            })
        }
        Err(e) => Err(e),
    }
}

/// Replace every `UserData::File` with the file's contents
pub fn resolve_user_data(stack: &mut Stack, base: &Path) -> Result<()> {
    for resource in &mut stack.resources {
        if let ResourceKind::Instance(instance) = &mut resource.kind
            && let Some(UserData::File(path)) = &instance.user_data
        {
            let full = if path.is_absolute() {
                path.clone()
            } else {
                base.join(path)
            };
            debug!(resource = %resource.name, file = %full.display(), "Reading user data");

            let script = std::fs::read_to_string(&full).map_err(|e| StackError::IoError {
                path: full.clone(),
                message: e.to_string(),
            })?;
            instance.user_data = Some(UserData::Inline(script));
        }
    }
    Ok(())
}
