//! CLI integration tests for cycle-post
//!
//! None of these reach the network: every case fails or finishes before
//! the token endpoint would be called.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to escape path for TOML on Windows
fn escape_path_for_toml(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "\\\\")
}

/// Temp dir with a config pointing at a pool of two singles and one thread
fn setup_test_env() -> (TempDir, String) {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    let pool_path = root.join("tweets.json");
    let state_path = root.join("state.json");
    let creds_path = root.join("tokens.json");

    fs::write(
        &pool_path,
        r#"[
  {"type": "single", "content": "first"},
  {"type": "single", "content": "second"},
  {"type": "thread", "content": ["one", "two"]}
]"#,
    )
    .unwrap();

    let config_path = root.join("config.toml");
    let config_content = format!(
        r#"
[content]
pool = "{}"

[storage]
state = "{}"
credentials = "{}"

[api]
base_url = "http://127.0.0.1:9/2"
"#,
        escape_path_for_toml(&pool_path),
        escape_path_for_toml(&state_path),
        escape_path_for_toml(&creds_path),
    );
    fs::write(&config_path, config_content).unwrap();

    (temp_dir, config_path.to_string_lossy().to_string())
}

fn cycle_post() -> Command {
    let mut cmd = Command::cargo_bin("cycle-post").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("CYCLECAST_CONFIG")
        .env_remove("CLIENT_ID")
        .env_remove("CLIENT_SECRET");
    cmd
}

#[test]
fn test_help_flag_output() {
    cycle_post()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Publish the next item"))
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--status"))
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--format"));
}

#[test]
fn test_version_flag_output() {
    cycle_post()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cycle-post"));
}

#[test]
fn test_missing_client_id_fails_before_posting() {
    let (temp_dir, config_path) = setup_test_env();

    cycle_post()
        .args(["--config", &config_path])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("CLIENT_ID"));

    // Nothing was selected either
    assert!(!temp_dir.path().join("state.json").exists());
}

#[test]
fn test_blank_client_secret_counts_as_missing() {
    let (_temp_dir, config_path) = setup_test_env();

    cycle_post()
        .env("CLIENT_ID", "id")
        .env("CLIENT_SECRET", "   ")
        .args(["--config", &config_path])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("CLIENT_SECRET"));
}

#[test]
fn test_missing_credentials_points_to_setup() {
    let (_temp_dir, config_path) = setup_test_env();

    cycle_post()
        .env("CLIENT_ID", "id")
        .env("CLIENT_SECRET", "secret")
        .args(["--config", &config_path])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("cycle-setup"));
}

#[test]
fn test_dry_run_prints_next_item_without_credentials() {
    let (temp_dir, config_path) = setup_test_env();

    cycle_post()
        .args(["--config", &config_path, "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("next: #"));

    let state: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(temp_dir.path().join("state.json")).unwrap())
            .unwrap();
    assert_eq!(state["order"].as_array().unwrap().len(), 3);
    assert!(state["posted"].as_array().unwrap().is_empty());
}

#[test]
fn test_dry_run_is_stable() {
    let (_temp_dir, config_path) = setup_test_env();

    let first = cycle_post()
        .args(["--config", &config_path, "--dry-run", "--format", "json"])
        .output()
        .unwrap();
    let second = cycle_post()
        .args(["--config", &config_path, "--dry-run", "--format", "json"])
        .output()
        .unwrap();

    assert!(first.status.success());
    let first: serde_json::Value = serde_json::from_slice(&first.stdout).unwrap();
    let second: serde_json::Value = serde_json::from_slice(&second.stdout).unwrap();
    assert_eq!(first["index"], second["index"]);
    assert_eq!(first["stage"], "idle");
}

#[test]
fn test_status_json() {
    let (_temp_dir, config_path) = setup_test_env();

    let output = cycle_post()
        .args(["--config", &config_path, "--status", "--format", "json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["pool_size"], 3);
    assert_eq!(status["posted"], 0);
    assert_eq!(status["remaining"], 3);
}

#[test]
fn test_unknown_format_is_invalid_input() {
    let (_temp_dir, config_path) = setup_test_env();

    cycle_post()
        .args(["--config", &config_path, "--status", "--format", "yaml"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("yaml"));
}

#[test]
fn test_missing_pool_file() {
    let (temp_dir, config_path) = setup_test_env();
    fs::remove_file(temp_dir.path().join("tweets.json")).unwrap();

    cycle_post()
        .args(["--config", &config_path, "--dry-run"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("tweets.json"));
}

#[test]
fn test_missing_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope.toml");

    cycle_post()
        .args(["--config", missing.to_str().unwrap(), "--status"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("config"));
}
