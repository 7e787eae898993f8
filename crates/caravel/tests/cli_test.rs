use assert_cmd::Command;
use predicates::prelude::*;

/// Help lists every subcommand
#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("caravel").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("up"))
        .stdout(predicate::str::contains("down"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("auth"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("caravel").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("caravel"));
}

#[test]
fn test_down_help_mentions_yes_flag() {
    let mut cmd = Command::cargo_bin("caravel").unwrap();
    cmd.arg("down")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--yes"));
}

#[test]
fn test_invalid_command() {
    let mut cmd = Command::cargo_bin("caravel").unwrap();
    cmd.arg("invalid-command").assert().failure();
}

/// Without a caravel.yaml anywhere, plan fails with the config hint
#[test]
fn test_plan_without_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("caravel").unwrap();
    cmd.current_dir(temp_dir.path())
        .env_remove("CARAVEL_CONFIG_PATH")
        .env_remove("XDG_CONFIG_HOME")
        .env("HOME", temp_dir.path())
        .arg("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No configuration file found"));
}

/// A config with a malformed account id is rejected before any AWS call
#[test]
fn test_up_rejects_invalid_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        temp_dir.path().join("caravel.yaml"),
        "project: demo\nregion: us-east-1\naccount_id: \"42\"\nvpc_id: vpc-1\nsubnet_ids: [a, b]\n",
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("caravel").unwrap();
    cmd.current_dir(temp_dir.path())
        .env_remove("CARAVEL_CONFIG_PATH")
        .arg("up")
        .assert()
        .failure()
        .stderr(predicate::str::contains("account_id"));
}
