//! StackFlow Cloud
//!
//! Abstraction over the external provisioning engine. StackFlow renders a
//! declaration into a [`Program`]; an engine implementation previews,
//! applies and destroys it and reports the stack outputs.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │        stackflow CLI         │
//! │   (preview / up / destroy)   │
//! └──────────────┬───────────────┘
//!                │ Program
//! ┌──────────────▼───────────────┐
//! │       stackflow-cloud        │
//! │  trait ProvisioningEngine    │
//! └──────────────┬───────────────┘
//!                │
//! ┌──────────────▼───────────────┐
//! │    stackflow-cloud-pulumi    │
//! │       (pulumi CLI)           │
//! └──────────────────────────────┘
//! ```

pub mod action;
pub mod engine;
pub mod error;

// Re-exports
pub use action::{Action, ActionType, ApplyResult, Plan, PlanSummary};
pub use engine::{AuthStatus, Program, ProvisioningEngine, StackOutputs};
pub use error::{CloudError, Result};
