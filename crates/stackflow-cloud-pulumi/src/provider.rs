//! Pulumi engine implementation

use crate::error::Result;
use crate::pulumi::{PULUMI_BIN, Pulumi};
use crate::workspace::Workspace;
use async_trait::async_trait;
use chrono::Utc;
use stackflow_cloud::{
    ApplyResult, AuthStatus, Plan, PlanSummary, Program, ProvisioningEngine, StackOutputs,
};
use std::path::{Path, PathBuf};

/// Provisioning through the pulumi CLI
pub struct PulumiEngine {
    project_root: PathBuf,
    binary: String,
}

impl PulumiEngine {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
            binary: PULUMI_BIN.to_string(),
        }
    }

    /// Use a specific pulumi binary instead of the one on PATH
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn workspace(&self, program: &Program) -> Workspace {
        Workspace::new(&self.project_root, &program.project)
    }

    /// Write the workspace, creating the program's stack when missing
    ///
    /// Used by operations that deploy.
    async fn prepare(&self, program: &Program) -> Result<Pulumi> {
        let workspace = self.workspace(program);
        workspace.write(program).await?;

        let pulumi = Pulumi::new(&self.binary, workspace.dir());
        pulumi.select_or_create_stack(&program.stack).await?;
        tracing::info!(
            project = %program.project,
            stack = %program.stack,
            workspace = %workspace.dir().display(),
            "Selected stack"
        );
        Ok(pulumi)
    }

    /// Write the program and select a stack that must already exist
    ///
    /// Used by operations that only read or tear down, so a mistyped stack
    /// name fails instead of creating an empty stack.
    async fn prepare_existing(&self, program: &Program) -> Result<Pulumi> {
        let workspace = self.workspace(program);
        workspace.write_manifest(program).await?;

        let pulumi = Pulumi::new(&self.binary, workspace.dir());
        pulumi.select_stack(&program.stack).await?;
        tracing::info!(
            project = %program.project,
            stack = %program.stack,
            "Selected existing stack"
        );
        Ok(pulumi)
    }
}

#[async_trait]
impl ProvisioningEngine for PulumiEngine {
    fn name(&self) -> &str {
        "pulumi"
    }

    fn display_name(&self) -> &str {
        "Pulumi"
    }

    async fn check_auth(&self) -> stackflow_cloud::Result<AuthStatus> {
        let pulumi = Pulumi::new(&self.binary, &self.project_root);
        let version = pulumi.version().await?;
        tracing::debug!(version = %version, "Found pulumi");

        match pulumi.whoami().await {
            Ok(user) => Ok(AuthStatus::ok(user)),
            Err(e) => Ok(AuthStatus::failed(e.to_string())),
        }
    }

    async fn preview(&self, program: &Program) -> stackflow_cloud::Result<Plan> {
        let pulumi = self.prepare(program).await?;
        let plan = pulumi.preview(&program.stack).await?;
        tracing::info!(summary = %plan.summary(), "Preview complete");
        Ok(plan)
    }

    async fn apply(&self, program: &Program, plan: &Plan) -> stackflow_cloud::Result<ApplyResult> {
        let started_at = Utc::now();
        let pulumi = self.prepare(program).await?;
        pulumi.up(&program.stack).await?;

        let result = ApplyResult::new(started_at, plan.summary());
        tracing::info!(duration_ms = result.duration_ms(), "Deployment complete");
        Ok(result)
    }

    async fn destroy(&self, program: &Program) -> stackflow_cloud::Result<ApplyResult> {
        let started_at = Utc::now();
        let pulumi = self.prepare_existing(program).await?;
        pulumi.destroy(&program.stack).await?;

        let result = ApplyResult::new(started_at, PlanSummary::default());
        tracing::info!(duration_ms = result.duration_ms(), "Destroy complete");
        Ok(result)
    }

    async fn outputs(&self, program: &Program) -> stackflow_cloud::Result<StackOutputs> {
        let pulumi = self.prepare_existing(program).await?;
        Ok(pulumi.stack_output(&program.stack).await?)
    }
}
