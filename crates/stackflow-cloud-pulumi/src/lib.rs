//! Pulumi engine for StackFlow
//!
//! Implements [`ProvisioningEngine`](stackflow_cloud::ProvisioningEngine)
//! by writing the rendered YAML program into a workspace directory and
//! driving the `pulumi` CLI against it.
//!
//! # Requirements
//!
//! - `pulumi` CLI must be installed and logged in to a backend
//! - AWS credentials are taken from the ambient environment
//!
//! # Example
//!
//! ```ignore
//! use stackflow_cloud::{Program, ProvisioningEngine};
//! use stackflow_cloud_pulumi::PulumiEngine;
//!
//! let engine = PulumiEngine::new(&project_root);
//! let plan = engine.preview(&program).await?;
//! println!("{}", plan.summary());
//! ```

pub mod error;
pub mod provider;
pub mod pulumi;
pub mod workspace;

pub use error::{PulumiError, Result};
pub use provider::PulumiEngine;
pub use pulumi::{PULUMI_BIN, Pulumi, parse_outputs, parse_preview};
pub use workspace::Workspace;
