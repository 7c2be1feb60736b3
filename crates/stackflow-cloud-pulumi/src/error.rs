//! Pulumi engine error types

use stackflow_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PulumiError {
    #[error("pulumi not found ({0}). Please install: https://www.pulumi.com/docs/install/")]
    PulumiNotFound(String),

    #[error("pulumi command failed: {0}")]
    CommandFailed(String),

    #[error("invalid stack config: {0}")]
    StackConfig(String),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PulumiError>;

impl From<PulumiError> for CloudError {
    fn from(e: PulumiError) -> Self {
        match e {
            PulumiError::PulumiNotFound(binary) => CloudError::EngineNotFound(binary),
            PulumiError::CommandFailed(message) => CloudError::CommandFailed(message),
            PulumiError::StackConfig(message) => CloudError::InvalidConfig(message),
            PulumiError::YamlError(e) => CloudError::InvalidConfig(e.to_string()),
            PulumiError::JsonError(e) => CloudError::Json(e),
            PulumiError::IoError(e) => CloudError::Io(e),
        }
    }
}
