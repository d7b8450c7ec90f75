//! Binary smoke tests

use assert_cmd::Command;
use predicates::prelude::*;

fn cli(data_dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("chat-collections").expect("binary should build");
    cmd.arg("--data-dir")
        .arg(data_dir.path())
        .env_remove("CHAT_COLLECTIONS_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_options() {
    let dir = tempfile::tempdir().unwrap();
    cli(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("--server"))
        .stdout(predicate::str::contains("--demo"));
}

#[test]
fn test_unknown_model_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    cli(&dir)
        .args(["--model", "gpt-9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown model"));
}

#[test]
fn test_demo_lists_collections_and_quits() {
    let dir = tempfile::tempdir().unwrap();
    cli(&dir)
        .arg("--demo")
        .write_stdin("/search recipe\n/quit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed in as Mock User."))
        .stdout(predicate::str::contains("Trip Planning"))
        .stdout(predicate::str::contains("demo-2  Recipes"));

    assert!(dir.path().join("config.toml").exists());
    assert!(dir.path().join("logs").join("chat-collections.log").exists());
}

#[test]
fn test_invalid_config_is_reported_and_logged() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.toml"), "this is = = not toml [[[").unwrap();

    cli(&dir)
        .arg("--demo")
        .write_stdin("/quit\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Ignoring invalid config file"));

    let log = std::fs::read_to_string(dir.path().join("logs").join("chat-collections.log")).unwrap();
    assert!(log.contains("Ignoring invalid config file"), "log was: {}", log);
}

#[test]
fn test_unreachable_server_stops_before_shell() {
    let dir = tempfile::tempdir().unwrap();
    // Nothing listens on the discard port.
    cli(&dir)
        .args(["--server", "http://127.0.0.1:9", "--token", "tok"])
        .write_stdin("/list\n")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Could not check sign-in"))
        .stdout(predicate::str::contains("Type /help").not());
}

#[test]
fn test_unknown_command_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    cli(&dir)
        .arg("--demo")
        .write_stdin("/frobnicate\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Unknown command '/frobnicate'"));
}
