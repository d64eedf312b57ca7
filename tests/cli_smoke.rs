//! Smoke tests for the ideaforge binary in --dry-run mode
//!
//! Each test works in its own temp directory with a local config file, so
//! nothing touches the user's configuration or store.

use assert_cmd::assert::OutputAssertExt;
use predicates::prelude::*;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let config_dir = dir.path().join(".ideaforge");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        "[defaults]\nprovider = \"anthropic\"\nstage_timeout_secs = 30\n",
    )
    .unwrap();
    dir
}

fn ideaforge(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ideaforge"));
    cmd.current_dir(dir)
        .arg("--dry-run")
        .arg("--store")
        .arg(dir.join("store/projects.json"))
        .env_remove("RUST_LOG");
    cmd
}

fn init_project(dir: &Path) {
    ideaforge(dir)
        .args([
            "init",
            "Guitar Lessons",
            "--requirements",
            "A site listing guitar lessons with prices",
            "--app-type",
            "static_website",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\": \"1\""));
}

#[test]
fn version_output() {
    Command::new(assert_cmd::cargo::cargo_bin!("ideaforge"))
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ideaforge"));
}

#[test]
fn catalog_lists_stacks() {
    let dir = workspace();
    ideaforge(dir.path())
        .args(["catalog", "--app-type", "mobile_app"])
        .assert()
        .success()
        .stdout(predicate::str::contains("flutter_python"))
        .stdout(predicate::str::contains("react_nodejs").not());

    ideaforge(dir.path())
        .args(["catalog", "--app-type", "spaceship"])
        .assert()
        .code(2);
}

#[test]
fn stage_out_of_order_exits_with_failure_envelope() {
    let dir = workspace();
    init_project(dir.path());

    ideaforge(dir.path())
        .args(["run", "1", "ux-design"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"success\": false"))
        .stdout(predicate::str::contains("StagePrerequisiteNotMet"));
}

#[test]
fn unknown_project_is_a_cli_error() {
    let dir = workspace();
    ideaforge(dir.path())
        .args(["status", "99"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn full_dry_run_pipeline() {
    let dir = workspace();
    init_project(dir.path());

    for stage in ["requirements", "architecture", "ux-design"] {
        ideaforge(dir.path())
            .args(["run", "1", stage])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"success\": true"));
    }

    let out = dir.path().join("out");
    ideaforge(dir.path())
        .args(["generate", "1", "--out"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"outcome\": \"completed\""));

    let root = out.join("1_guitar_lessons");
    assert!(root.join("index.html").is_file());
    assert!(root.join("README.md").is_file());
    assert!(root.join("docs/data-model.md").is_file());

    ideaforge(dir.path())
        .args(["status", "1", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"Project Generated\""));
}
