#![cfg(target_os = "linux")]

use std::process::Command;

use tempfile::TempDir;

#[test]
fn missing_display_fails_before_the_loop_starts() {
    let root = TempDir::new().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_demostuff"))
        .current_dir(root.path())
        .env_remove("DEMOSTUFF_CONFIG")
        .env_remove("DISPLAY")
        .env_remove("WAYLAND_DISPLAY")
        .env_remove("WAYLAND_SOCKET")
        .env("RUST_LOG", "info")
        .env("NO_COLOR", "1")
        .args(["--max-frames", "1"])
        .output()
        .expect("failed to run demostuff without a display");

    let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
    log.push_str(&String::from_utf8_lossy(&output.stderr));

    assert_eq!(output.status.code(), Some(255), "log:\n{log}");
    assert!(
        log.contains("failed to initialise the windowing system"),
        "log:\n{log}"
    );
    assert!(log.contains("demo terminated"), "log:\n{log}");
    assert!(!log.contains("demo running"), "log:\n{log}");
    assert!(!log.contains("0.00000"), "log:\n{log}");
}
