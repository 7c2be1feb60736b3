#![allow(deprecated)]

mod common;

use assert_cmd::Command;
use common::{MISSING_PULUMI, TestProject};
use predicates::prelude::*;

const BROKEN_STACK: &str = r#"
vpc "main" { cidr-block "10.0.0.0/16"; }
subnet "public" { vpc "missing"; cidr-block "10.0.1.0/24"; }
"#;

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("stackflow").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("render"))
        .stdout(predicate::str::contains("preview"))
        .stdout(predicate::str::contains("destroy"))
        .stdout(predicate::str::contains("outputs"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("stackflow").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("stackflow"));
}

#[test]
fn test_up_help() {
    let mut cmd = Command::cargo_bin("stackflow").unwrap();
    cmd.arg("up")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--yes"))
        .stdout(predicate::str::contains("--stack"));
}

#[test]
fn test_invalid_command() {
    let mut cmd = Command::cargo_bin("stackflow").unwrap();
    cmd.arg("invalid-command").assert().failure();
}

#[test]
fn test_validate_builtin_declaration() {
    let project = TestProject::new();
    project
        .command()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Declaration is valid"))
        .stdout(predicate::str::contains("pulumi-ec2"))
        .stdout(predicate::str::contains("instance_public_ip"))
        .stderr(predicate::str::contains("no stack.kdl found"));
}

#[test]
fn test_validate_reports_unknown_reference() {
    let project = TestProject::new();
    project.write_stack_kdl(BROKEN_STACK);

    project
        .command()
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid declaration"))
        .stderr(predicate::str::contains("missing"));
}

#[test]
fn test_init_then_validate() {
    let project = TestProject::new();
    project.command().arg("init").assert().success();

    assert!(project.join("stack.kdl").exists());
    assert!(project.join("boot.sh").exists());

    project
        .command()
        .arg("validate")
        .assert()
        .success()
        .stderr(predicate::str::contains("stack.kdl"));
}

#[test]
fn test_init_refuses_to_overwrite() {
    let project = TestProject::new();
    project.write_stack_kdl("// mine\n");

    project
        .command()
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    project.command().args(["init", "--force"]).assert().success();
    let content = std::fs::read_to_string(project.join("stack.kdl")).unwrap();
    assert!(content.contains("pulumi-vpc"));
}

#[test]
fn test_graph_json() {
    let project = TestProject::new();
    let output = project
        .command()
        .args(["graph", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["creation_order"][0], "pulumi-vpc");
    assert_eq!(summary["creation_order"][4], "pulumi-rt-assoc");
    assert_eq!(summary["creation_order"][7], "pulumi-ec2");
    assert_eq!(summary["layers"].as_array().unwrap().len(), 4);
}

#[test]
fn test_render_to_stdout() {
    let project = TestProject::new();
    let output = project.command().arg("render").output().unwrap();
    assert!(output.status.success());

    let program: serde_yaml::Value = serde_yaml::from_slice(&output.stdout).unwrap();
    assert_eq!(program["runtime"], serde_yaml::Value::from("yaml"));
    assert_eq!(
        program["resources"]["pulumi-igw"]["properties"]["vpcId"],
        serde_yaml::Value::from("${pulumi-vpc.id}")
    );
}

#[test]
fn test_render_to_file() {
    let project = TestProject::new();
    let target = project.join("out").join("Pulumi.yaml");

    project
        .command()
        .arg("render")
        .arg("--output")
        .arg(&target)
        .assert()
        .success();

    let content = std::fs::read_to_string(&target).unwrap();
    assert!(content.contains("aws:ec2:Instance"));
}

#[test]
fn test_render_rejects_broken_stack() {
    let project = TestProject::new();
    project.write_stack_kdl(BROKEN_STACK);
    project.command().arg("render").assert().failure();
}

#[test]
fn test_preview_without_pulumi() {
    let project = TestProject::new();
    project
        .command()
        .args(["preview", "--pulumi-bin", MISSING_PULUMI])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Preview failed"))
        .stderr(predicate::str::contains(MISSING_PULUMI));

    // The workspace is written before the engine runs
    assert!(
        project
            .join(".stackflow")
            .join("minimal-web")
            .join("Pulumi.yaml")
            .exists()
    );
}

#[test]
fn test_outputs_check_without_pulumi() {
    let project = TestProject::new();
    project
        .command()
        .args(["outputs", "--check", "--stack", "staging"])
        .env("STACKFLOW_PULUMI_BIN", MISSING_PULUMI)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read outputs"));
}

#[test]
fn test_up_without_pulumi_stops_before_deploying() {
    let project = TestProject::new();
    project
        .command()
        .args(["up", "--yes", "--pulumi-bin", MISSING_PULUMI])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Pulumi is not available"))
        .stdout(predicate::str::contains("Deploying").not());

    assert!(!project.join(".stackflow").exists());
}
