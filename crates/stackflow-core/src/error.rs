use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackError {
    #[error("KDL parse error: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("File read error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error: {path}\nreason: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Template render error: {0}")]
    TemplateRenderError(String),

    #[error(
        "Project root not found\nsearch started at: {0}\nhint: run inside a directory containing stack.kdl"
    )]
    ProjectRootNotFound(PathBuf),

    #[error("Resource '{0}' is declared more than once")]
    DuplicateResource(String),

    #[error("'{from}' references unknown resource '{to}'")]
    UnknownReference { from: String, to: String },

    #[error("'{from}' expects '{to}' to be a {expected}, found {found}")]
    ReferenceKindMismatch {
        from: String,
        to: String,
        expected: String,
        found: String,
    },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Render error: {0}")]
    Render(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, StackError>;
