use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Binary name that is never on PATH
#[allow(dead_code)]
pub const MISSING_PULUMI: &str = "stackflow-test-no-such-pulumi";

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write_stack_kdl(&self, content: &str) {
        fs::write(self.root.path().join("stack.kdl"), content).unwrap();
    }

    #[allow(dead_code)]
    pub fn write_file(&self, name: &str, content: &str) {
        fs::write(self.root.path().join(name), content).unwrap();
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    #[allow(dead_code)]
    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.root.path().join(name)
    }

    /// `stackflow` command rooted at this project with a clean environment
    #[allow(deprecated)]
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("stackflow").unwrap();
        cmd.current_dir(self.path())
            .env_remove("STACKFLOW_STACK")
            .env_remove("STACKFLOW_PULUMI_BIN")
            .env("STACKFLOW_PROJECT_ROOT", self.path())
            .env("RUST_LOG", "off");
        cmd
    }
}

/// Stand-in `pulumi` executable
///
/// Logs every invocation, answers `preview --json` and `stack output --json`
/// from canned files, and keeps a stack registry on disk so that
/// `stack select` without `--create` fails for unknown stacks.
#[cfg(unix)]
#[allow(dead_code)]
pub struct StubPulumi {
    dir: TempDir,
}

#[cfg(unix)]
#[allow(dead_code)]
impl StubPulumi {
    pub fn new() -> Self {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("stacks")).unwrap();
        fs::write(root.join("preview.json"), r#"{"steps": []}"#).unwrap();
        fs::write(root.join("outputs.json"), "{}").unwrap();

        let script = format!(
            r#"#!/bin/sh
root="{root}"
echo "$*" >> "$root/calls.log"
case "$1" in
  version) echo "v3.130.0" ;;
  whoami) echo "stub-user" ;;
  stack)
    case "$2" in
      select)
        if [ "$3" = "--create" ]; then
          touch "$root/stacks/$4"
        elif [ ! -f "$root/stacks/$3" ]; then
          echo "error: no stack named '$3' found" >&2
          exit 255
        fi
        ;;
      output) cat "$root/outputs.json" ;;
      *) echo "unexpected: $*" >&2; exit 1 ;;
    esac
    ;;
  preview) cat "$root/preview.json" ;;
  up) echo "Updating ($6)" ;;
  destroy) echo "Destroying ($6)" ;;
  *) echo "unexpected: $*" >&2; exit 1 ;;
esac
"#,
            root = root.display()
        );

        let binary = root.join("pulumi");
        fs::write(&binary, script).unwrap();
        let mut perms = fs::metadata(&binary).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&binary, perms).unwrap();

        Self { dir }
    }

    pub fn binary(&self) -> PathBuf {
        self.dir.path().join("pulumi")
    }

    /// Register a stack as already created
    pub fn with_stack(self, name: &str) -> Self {
        fs::write(self.dir.path().join("stacks").join(name), "").unwrap();
        self
    }

    pub fn with_preview(self, json: &str) -> Self {
        fs::write(self.dir.path().join("preview.json"), json).unwrap();
        self
    }

    pub fn with_outputs(self, json: &str) -> Self {
        fs::write(self.dir.path().join("outputs.json"), json).unwrap();
        self
    }

    pub fn has_stack(&self, name: &str) -> bool {
        self.dir.path().join("stacks").join(name).exists()
    }

    /// Argument lines of every invocation, in order
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.dir.path().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}
