//! Engine workspace on disk
//!
//! Pulumi runs against a directory holding `Pulumi.yaml` and one
//! `Pulumi.<stack>.yaml` per stack. StackFlow keeps that directory under
//! `<project root>/.stackflow/<project>/`. The program is rewritten before
//! every run; a stack config file is shared with pulumi, so only the keys
//! the declaration sets are touched and everything else is kept.

use crate::error::{PulumiError, Result};
use serde_yaml::{Mapping, Value};
use stackflow_cloud::Program;
use std::path::{Path, PathBuf};
use tokio::fs;

const WORKSPACE_DIR: &str = ".stackflow";
const MANIFEST_FILE: &str = "Pulumi.yaml";
const MANIFEST_BACKUP: &str = "Pulumi.yaml.backup";
const CONFIG_KEY: &str = "config";

/// Workspace directory for one project
#[derive(Debug, Clone)]
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    pub fn new(project_root: impl AsRef<Path>, project: &str) -> Self {
        Self {
            dir: project_root.as_ref().join(WORKSPACE_DIR).join(project),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the program file path
    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    /// Get the backup of the previous program
    pub fn backup_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_BACKUP)
    }

    /// Get the config file path of a stack
    pub fn stack_config_path(&self, stack: &str) -> PathBuf {
        self.dir.join(format!("Pulumi.{}.yaml", stack))
    }

    async fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).await?;
            tracing::debug!("Created workspace directory: {}", self.dir.display());
        }
        Ok(())
    }

    /// Write the program and stack config
    pub async fn write(&self, program: &Program) -> Result<()> {
        self.write_manifest(program).await?;
        self.write_stack_config(program).await
    }

    /// Write the program
    ///
    /// An existing program that differs from the new one is kept as
    /// `Pulumi.yaml.backup`.
    pub async fn write_manifest(&self, program: &Program) -> Result<()> {
        self.ensure_dir().await?;

        let path = self.manifest_path();
        let backup = self.backup_path();

        if path.exists() {
            let current = fs::read_to_string(&path).await?;
            if current != program.manifest {
                if backup.exists() {
                    fs::remove_file(&backup).await?;
                }
                fs::rename(&path, &backup).await?;
                tracing::debug!("Created program backup");
            }
        }
        fs::write(&path, &program.manifest).await?;

        tracing::debug!(dir = %self.dir.display(), "Wrote engine program");
        Ok(())
    }

    /// Merge the declared config keys into `Pulumi.<stack>.yaml`
    ///
    /// Keys pulumi owns (`encryptionsalt`, `secretsprovider`, values from
    /// `pulumi config set`) survive. Nothing is written when the declaration
    /// sets no keys or the file already holds them.
    pub async fn write_stack_config(&self, program: &Program) -> Result<()> {
        if program.stack_config.trim().is_empty() {
            return Ok(());
        }
        self.ensure_dir().await?;

        let path = self.stack_config_path(&program.stack);
        let existing = if path.exists() {
            Some(fs::read_to_string(&path).await?)
        } else {
            None
        };

        if let Some(merged) = merge_stack_config(existing.as_deref(), &program.stack_config)? {
            fs::write(&path, merged).await?;
            tracing::debug!(stack = %program.stack, "Wrote stack config");
        }
        Ok(())
    }

    /// Read the program last written, if any
    pub async fn read_manifest(&self) -> Result<Option<String>> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path).await?))
    }
}

/// Set the `config` entries of `rendered` on top of `existing`
///
/// Returns `None` when the result would not change the file.
pub fn merge_stack_config(existing: Option<&str>, rendered: &str) -> Result<Option<String>> {
    let mut rendered = as_mapping(serde_yaml::from_str(rendered)?)?;
    let declared = config_section(&mut rendered)?.clone();
    if declared.is_empty() {
        return Ok(None);
    }

    let original: Value = match existing {
        Some(content) => serde_yaml::from_str(content)?,
        None => Value::Null,
    };
    let mut document = as_mapping(original.clone())?;

    let config = config_section(&mut document)?;
    for (key, value) in declared {
        config.insert(key, value);
    }

    let merged = Value::Mapping(document);
    if existing.is_some() && merged == original {
        return Ok(None);
    }
    Ok(Some(serde_yaml::to_string(&merged)?))
}

fn as_mapping(value: Value) -> Result<Mapping> {
    match value {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        other => Err(PulumiError::StackConfig(format!(
            "expected a mapping, found {:?}",
            other
        ))),
    }
}

/// The `config` mapping of a stack config document, created when absent
fn config_section(document: &mut Mapping) -> Result<&mut Mapping> {
    let key = Value::String(CONFIG_KEY.to_string());
    if matches!(document.get(&key), None | Some(Value::Null)) {
        document.insert(key.clone(), Value::Mapping(Mapping::new()));
    }
    match document.get_mut(&key) {
        Some(Value::Mapping(config)) => Ok(config),
        _ => Err(PulumiError::StackConfig(format!(
            "`{}` is not a mapping",
            CONFIG_KEY
        ))),
    }
}
