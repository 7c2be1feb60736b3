//! StackFlow Core
//!
//! Declaration of a minimal public web stack and the tooling around it:
//! the typed resource model, the `stack.kdl` parser, graph validation and
//! ordering, and rendering into a Pulumi YAML program.
//!
//! ```text
//! stack.kdl ──parse──▶ Stack ──build──▶ ResourceGraph
//!    (or built-in)       │                 (validated DAG)
//!                        └──render──▶ Pulumi.yaml
//! ```

pub mod declaration;
pub mod discovery;
pub mod error;
pub mod graph;
pub mod loader;
pub mod model;
pub mod parser;
pub mod render;
pub mod template;

// Re-exports
pub use declaration::minimal_web_stack;
pub use discovery::{STACK_FILE, STACKFLOW_DIR, find_project_root, stack_file};
pub use error::{Result, StackError};
pub use graph::{Edge, GraphSummary, ResourceGraph};
pub use loader::{
    LoadedStack, StackSource, load_or_builtin, load_project_from_root, resolve_user_data,
};
pub use model::*;
pub use parser::{parse_kdl_file, parse_kdl_string};
pub use render::{render_program, render_stack_config};
pub use template::{TemplateProcessor, Variables};
