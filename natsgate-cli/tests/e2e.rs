//! End-to-end tests that run the built natsgate binary
//!
//! Gated behind the `integration` feature flag. Run with:
//!
//! ```sh
//! cargo test -p natsgate-cli --features integration
//! ```

#![cfg(feature = "integration")]

use std::process::Command;

fn natsgate() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_natsgate"));
    // keep the developer's .natsgate/ out of the picture
    let empty = std::env::temp_dir().join("natsgate-e2e-empty");
    cmd.env("NATSGATE_CONFIG_DIR", empty);
    cmd
}

#[test]
fn help_lists_commands() {
    let output = natsgate().arg("--help").output().expect("failed to run natsgate");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Websocket gateway to NATS topics"));
    assert!(stdout.contains("serve"));
    assert!(stdout.contains("config"));
}

#[test]
fn config_show_prints_defaults() {
    let output = natsgate()
        .args(["config", "show"])
        .output()
        .expect("failed to run natsgate config show");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("url_path = \"/\""));
    assert!(stdout.contains("bus_pool_size = 2"));
    assert!(stdout.contains("unauthenticated_timeout = \"1m\""));
}

#[test]
fn config_show_applies_explicit_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("gateway.toml");
    std::fs::write(&path, "topics = [\"test.a\"]\nbus_address = \"memory://\"\n").unwrap();

    let output = natsgate()
        .args(["--config", path.to_str().unwrap(), "config", "show"])
        .output()
        .expect("failed to run natsgate config show");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("bus_address = \"memory://\""));
    assert!(stdout.contains("\"test.a\""));
}

#[test]
fn config_path_shows_paths() {
    let output = natsgate()
        .args(["config", "path"])
        .output()
        .expect("failed to run natsgate config path");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("User config:"));
    assert!(stdout.contains("Project config:"));
    assert!(stdout.contains("natsgate-e2e-empty"));
}

#[test]
fn serve_without_jwks_url_fails() {
    let output = natsgate()
        .args(["serve", "--listen", "127.0.0.1:0", "--bus", "memory://"])
        .output()
        .expect("failed to run natsgate serve");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("jwks_url is required"));
}
