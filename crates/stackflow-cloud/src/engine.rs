//! Provisioning engine trait definition

use crate::action::{ApplyResult, Plan};
use crate::error::{CloudError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Provisioning engine abstraction trait
///
/// An engine owns state, diffing and ordering. StackFlow only hands it a
/// rendered [`Program`] and reports what comes back.
#[async_trait]
pub trait ProvisioningEngine: Send + Sync {
    /// Returns the engine name (e.g., "pulumi")
    fn name(&self) -> &str;

    /// Returns the engine display name for UI
    fn display_name(&self) -> &str;

    /// Check if the engine is installed and logged in
    async fn check_auth(&self) -> Result<AuthStatus>;

    /// Compute what a deployment of `program` would change
    async fn preview(&self, program: &Program) -> Result<Plan>;

    /// Deploy `program`; `plan` is the preview the user accepted
    async fn apply(&self, program: &Program, plan: &Plan) -> Result<ApplyResult>;

    /// Tear down every resource the stack manages
    async fn destroy(&self, program: &Program) -> Result<ApplyResult>;

    /// Read the exported outputs of the last deployment
    async fn outputs(&self, program: &Program) -> Result<StackOutputs>;
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Account/user information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}

/// A declaration rendered into the engine's input format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    /// Project name
    pub project: String,

    /// Engine stack (deployment target, e.g., "dev")
    pub stack: String,

    /// Program source (Pulumi.yaml)
    pub manifest: String,

    /// Per-stack config (Pulumi.<stack>.yaml)
    pub stack_config: String,

    /// Output names the declaration exports
    pub declared_outputs: Vec<String>,
}

impl Program {
    pub fn new(
        project: impl Into<String>,
        stack: impl Into<String>,
        manifest: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            stack: stack.into(),
            manifest: manifest.into(),
            stack_config: String::new(),
            declared_outputs: Vec::new(),
        }
    }

    pub fn with_stack_config(mut self, stack_config: impl Into<String>) -> Self {
        self.stack_config = stack_config.into();
        self
    }

    pub fn with_declared_outputs<I, S>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declared_outputs = outputs.into_iter().map(Into::into).collect();
        self
    }
}

/// Exported outputs of a deployed stack
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackOutputs {
    pub values: BTreeMap<String, serde_json::Value>,
}

impl StackOutputs {
    pub fn new(values: BTreeMap<String, serde_json::Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(|v| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.values.iter()
    }

    /// Fail when any of `names` is absent, null or an empty string
    pub fn check(&self, names: &[String]) -> Result<()> {
        let missing: Vec<&str> = names
            .iter()
            .filter(|name| match self.values.get(name.as_str()) {
                None | Some(serde_json::Value::Null) => true,
                Some(serde_json::Value::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            })
            .map(|name| name.as_str())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CloudError::OutputMissing(missing.join(", ")))
        }
    }
}
