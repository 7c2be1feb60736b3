//! pulumi CLI wrapper
//!
//! Wraps the pulumi CLI commands used to preview, deploy and tear down a
//! YAML program in a workspace directory.

use crate::error::{PulumiError, Result};
use serde::{Deserialize, Serialize};
use stackflow_cloud::{Action, ActionType, Plan, StackOutputs};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Default binary name
pub const PULUMI_BIN: &str = "pulumi";

/// pulumi CLI wrapper
pub struct Pulumi {
    binary: String,
    cwd: PathBuf,
}

impl Pulumi {
    pub fn new(binary: impl Into<String>, cwd: impl AsRef<Path>) -> Self {
        Self {
            binary: binary.into(),
            cwd: cwd.as_ref().to_path_buf(),
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args);
        cmd.current_dir(&self.cwd);
        cmd.env("PULUMI_SKIP_UPDATE_CHECK", "true");
        cmd
    }

    fn spawn_error(&self, e: std::io::Error) -> PulumiError {
        if e.kind() == ErrorKind::NotFound {
            PulumiError::PulumiNotFound(self.binary.clone())
        } else {
            PulumiError::IoError(e)
        }
    }

    /// Run a pulumi command and return stdout
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = self.command(args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running: {} {}", self.binary, args.join(" "));

        let output = cmd.output().await.map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let message = if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(PulumiError::CommandFailed(message));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Run a pulumi command with its progress shown on the terminal
    async fn run_attached(&self, args: &[&str]) -> Result<()> {
        let mut cmd = self.command(args);
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());

        tracing::debug!("Running: {} {}", self.binary, args.join(" "));

        let status = cmd.status().await.map_err(|e| self.spawn_error(e))?;
        if !status.success() {
            return Err(PulumiError::CommandFailed(format!(
                "{} {} exited with {}",
                self.binary,
                args.first().copied().unwrap_or_default(),
                status
            )));
        }
        Ok(())
    }

    /// Installed pulumi version
    pub async fn version(&self) -> Result<String> {
        Ok(self.run_command(&["version"]).await?.trim().to_string())
    }

    /// Logged-in user of the current backend
    pub async fn whoami(&self) -> Result<String> {
        Ok(self
            .run_command(&["whoami", "--non-interactive"])
            .await?
            .trim()
            .to_string())
    }

    /// Select an existing stack
    ///
    /// Fails with the engine's "no stack named" error when it does not exist.
    pub async fn select_stack(&self, stack: &str) -> Result<()> {
        self.run_command(&["stack", "select", stack, "--non-interactive"]).await?;
        Ok(())
    }

    /// Select a stack, creating it when it does not exist
    pub async fn select_or_create_stack(&self, stack: &str) -> Result<()> {
        self.run_command(&["stack", "select", "--create", stack, "--non-interactive"])
            .await?;
        Ok(())
    }

    /// Preview a deployment and return the planned steps
    pub async fn preview(&self, stack: &str) -> Result<Plan> {
        let output = self
            .run_command(&["preview", "--json", "--non-interactive", "--stack", stack])
            .await?;
        parse_preview(&output)
    }

    /// Deploy the program
    pub async fn up(&self, stack: &str) -> Result<()> {
        self.run_attached(&[
            "up",
            "--yes",
            "--skip-preview",
            "--non-interactive",
            "--stack",
            stack,
        ])
        .await
    }

    /// Destroy every resource of the stack
    pub async fn destroy(&self, stack: &str) -> Result<()> {
        self.run_attached(&[
            "destroy",
            "--yes",
            "--skip-preview",
            "--non-interactive",
            "--stack",
            stack,
        ])
        .await
    }

    /// Exported outputs of the stack
    pub async fn stack_output(&self, stack: &str) -> Result<StackOutputs> {
        let output = self
            .run_command(&["stack", "output", "--json", "--stack", stack])
            .await?;
        parse_outputs(&output)
    }
}

/// `pulumi preview --json` document (only the fields StackFlow reads)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewOutput {
    #[serde(default)]
    pub steps: Vec<PreviewStep>,

    #[serde(default)]
    pub change_summary: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewStep {
    pub op: String,
    pub urn: String,
}

impl PreviewStep {
    /// Map the step operation onto an action type
    ///
    /// The halves of a replacement (`create-replacement`, `delete-replaced`)
    /// are already covered by the `replace` step and yield `None`.
    pub fn action_type(&self) -> Option<ActionType> {
        match self.op.as_str() {
            "create" => Some(ActionType::Create),
            "update" => Some(ActionType::Update),
            "replace" => Some(ActionType::Replace),
            "delete" => Some(ActionType::Delete),
            "same" | "read" | "refresh" => Some(ActionType::NoOp),
            _ => None,
        }
    }
}

/// Split a URN into (type, name)
///
/// `urn:pulumi:<stack>::<project>::<parent$type>::<name>`; only the
/// resource's own type is returned.
pub fn parse_urn(urn: &str) -> Option<(&str, &str)> {
    let mut parts = urn.splitn(4, "::");
    let _stack = parts.next()?;
    let _project = parts.next()?;
    let qualified_type = parts.next()?;
    let name = parts.next()?;
    let resource_type = qualified_type.rsplit('$').next()?;
    Some((resource_type, name))
}

/// Parse preview JSON into a plan
///
/// Engine-internal resources (the stack itself and provider instances) are
/// left out.
pub fn parse_preview(output: &str) -> Result<Plan> {
    if output.trim().is_empty() {
        return Ok(Plan::empty());
    }

    let preview: PreviewOutput = serde_json::from_str(output)?;
    let actions = preview
        .steps
        .iter()
        .filter_map(|step| {
            let action_type = step.action_type()?;
            let (resource_type, name) = parse_urn(&step.urn)?;
            if resource_type.starts_with("pulumi:") {
                return None;
            }
            Some(Action::new(&step.urn, action_type, resource_type, name))
        })
        .collect();

    Ok(Plan::new(actions))
}

/// Parse `pulumi stack output --json`
pub fn parse_outputs(output: &str) -> Result<StackOutputs> {
    if output.trim().is_empty() {
        return Ok(StackOutputs::default());
    }
    Ok(serde_json::from_str(output)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREVIEW: &str = r#"{
        "config": {},
        "steps": [
            {"op": "create", "urn": "urn:pulumi:dev::minimal-web::pulumi:pulumi:Stack::minimal-web-dev"},
            {"op": "create", "urn": "urn:pulumi:dev::minimal-web::pulumi:providers:aws::default_6_0_0"},
            {"op": "create", "urn": "urn:pulumi:dev::minimal-web::aws:ec2/vpc:Vpc::pulumi-vpc"},
            {"op": "same", "urn": "urn:pulumi:dev::minimal-web::aws:ec2/subnet:Subnet::pulumi-public-subnet"},
            {"op": "replace", "urn": "urn:pulumi:dev::minimal-web::aws:ec2/instance:Instance::pulumi-ec2"},
            {"op": "create-replacement", "urn": "urn:pulumi:dev::minimal-web::aws:ec2/instance:Instance::pulumi-ec2"},
            {"op": "delete-replaced", "urn": "urn:pulumi:dev::minimal-web::aws:ec2/instance:Instance::pulumi-ec2"}
        ],
        "duration": 1200000000,
        "changeSummary": {"create": 2, "replace": 1, "same": 1}
    }"#;

    #[test]
    fn test_parse_urn() {
        assert_eq!(
            parse_urn("urn:pulumi:dev::minimal-web::aws:ec2/vpc:Vpc::pulumi-vpc"),
            Some(("aws:ec2/vpc:Vpc", "pulumi-vpc"))
        );
        assert_eq!(
            parse_urn("urn:pulumi:dev::p::my:index:Web$aws:ec2/instance:Instance::web"),
            Some(("aws:ec2/instance:Instance", "web"))
        );
        assert_eq!(parse_urn("not-a-urn"), None);
    }

    #[test]
    fn test_parse_preview() {
        let plan = parse_preview(PREVIEW).unwrap();
        let names: Vec<&str> = plan.actions.iter().map(|a| a.resource_name.as_str()).collect();
        assert_eq!(names, vec!["pulumi-vpc", "pulumi-public-subnet", "pulumi-ec2"]);

        let summary = plan.summary();
        assert_eq!(summary.create, 1);
        assert_eq!(summary.no_change, 1);
        assert_eq!(summary.replace, 1);
        assert!(plan.has_changes);
    }

    #[test]
    fn test_parse_preview_without_changes() {
        let plan = parse_preview(
            r#"{"steps": [{"op": "same", "urn": "urn:pulumi:dev::p::aws:ec2/vpc:Vpc::v"}]}"#,
        )
        .unwrap();
        assert!(!plan.has_changes);

        assert!(!parse_preview("").unwrap().has_changes);
        assert!(parse_preview("{}").unwrap().actions.is_empty());
    }

    #[test]
    fn test_parse_preview_rejects_garbage() {
        assert!(matches!(
            parse_preview("error: no stack selected"),
            Err(PulumiError::JsonError(_))
        ));
    }

    #[test]
    fn test_parse_outputs() {
        let outputs = parse_outputs(
            r#"{"instance_public_ip": "54.1.2.3", "instance_public_dns": "ec2-54-1-2-3.compute-1.amazonaws.com"}"#,
        )
        .unwrap();
        assert_eq!(outputs.get_str("instance_public_ip"), Some("54.1.2.3"));
        assert!(parse_outputs("  \n").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pulumi = Pulumi::new("stackflow-test-no-such-pulumi", temp_dir.path());
        assert!(matches!(
            pulumi.version().await,
            Err(PulumiError::PulumiNotFound(_))
        ));
    }
}
