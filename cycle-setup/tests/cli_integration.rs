//! CLI integration tests for cycle-setup
//!
//! The flow is driven through stdin. Every case stops before the token
//! exchange, so no request leaves the machine.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn escape_path_for_toml(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "\\\\")
}

fn setup_test_env() -> (TempDir, String) {
    let temp_dir = TempDir::new().unwrap();
    let creds_path = temp_dir.path().join("tokens.json");

    let config_path = temp_dir.path().join("config.toml");
    let config_content = format!(
        r#"
[storage]
credentials = "{}"

[api]
base_url = "http://127.0.0.1:9/2"
redirect_uri = "http://localhost:8765/callback"
"#,
        escape_path_for_toml(&creds_path),
    );
    fs::write(&config_path, config_content).unwrap();

    (temp_dir, config_path.to_string_lossy().to_string())
}

fn cycle_setup() -> Command {
    let mut cmd = Command::cargo_bin("cycle-setup").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("CYCLECAST_CONFIG")
        .env("CLIENT_ID", "test-client")
        .env("CLIENT_SECRET", "test-secret");
    cmd
}

#[test]
fn test_help_flag_output() {
    Command::cargo_bin("cycle-setup")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Authorize cycle-post"))
        .stdout(predicate::str::contains("--force"));
}

#[test]
fn test_prints_pkce_authorization_url() {
    let (_temp_dir, config_path) = setup_test_env();

    cycle_setup()
        .args(["--config", &config_path])
        .write_stdin("")
        .assert()
        .failure()
        .code(3)
        .stdout(predicate::str::contains("https://x.com/i/oauth2/authorize?"))
        .stdout(predicate::str::contains("client_id=test-client"))
        .stdout(predicate::str::contains("code_challenge_method=S256"))
        .stdout(predicate::str::contains("http://localhost:8765/callback"));
}

#[test]
fn test_rejects_callback_with_foreign_state() {
    let (temp_dir, config_path) = setup_test_env();

    cycle_setup()
        .args(["--config", &config_path])
        .write_stdin("http://localhost:8765/callback?state=forged&code=abc\n")
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("state"));

    assert!(!temp_dir.path().join("tokens.json").exists());
}

#[test]
fn test_reports_denied_authorization() {
    let (_temp_dir, config_path) = setup_test_env();

    cycle_setup()
        .args(["--config", &config_path])
        .write_stdin("http://localhost:8765/callback?error=access_denied\n")
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("access_denied"));
}

#[test]
fn test_keeps_existing_credentials_when_declined() {
    let (temp_dir, config_path) = setup_test_env();
    let creds_path = temp_dir.path().join("tokens.json");
    let existing = r#"{"access_token": "a", "refresh_token": "r"}"#;
    fs::write(&creds_path, existing).unwrap();

    cycle_setup()
        .args(["--config", &config_path])
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Keeping existing credentials"));

    assert_eq!(fs::read_to_string(&creds_path).unwrap(), existing);
}
