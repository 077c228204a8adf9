use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("simba").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Model-based RL"));
}

#[test]
fn test_cli_list() {
    let mut cmd = Command::cargo_bin("simba").unwrap();
    cmd.arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Available environments:"))
        .stdout(predicate::str::contains("point_mass"))
        .stdout(predicate::str::contains("pendulum"));
}

#[test]
fn test_cli_demo() {
    let mut cmd = Command::cargo_bin("simba").unwrap();
    cmd.arg("demo")
        .arg("pendulum")
        .arg("--steps")
        .arg("25")
        .assert()
        .success()
        .stdout(predicate::str::contains("Step 20: theta="))
        .stdout(predicate::str::contains("Demo finished after 25 steps"));
}

#[test]
fn test_cli_demo_unknown_env() {
    let mut cmd = Command::cargo_bin("simba").unwrap();
    cmd.arg("demo")
        .arg("cartpole")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown environment"));
}

#[test]
fn test_cli_train_tiny_config() {
    let mut cmd = Command::cargo_bin("simba").unwrap();
    cmd.arg("train")
        .arg("--config")
        .arg(fixture("tiny.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Training complete after 2 iterations"))
        .stdout(predicate::str::contains("mean_plan_score"));
}

#[test]
fn test_cli_train_overrides() {
    let mut cmd = Command::cargo_bin("simba").unwrap();
    cmd.arg("train")
        .arg("pendulum")
        .arg("--config")
        .arg(fixture("tiny.json"))
        .arg("--iterations")
        .arg("1")
        .arg("--log-frequency")
        .arg("0")
        .assert()
        .success()
        .stdout(predicate::str::contains("Training complete after 1 iterations"));
}

#[test]
fn test_cli_train_rejects_invalid_config() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "policy": {{ "n_elite": 0 }} }}"#).unwrap();

    let mut cmd = Command::cargo_bin("simba").unwrap();
    cmd.arg("train")
        .arg("--config")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("n_elite"));
}
