//! CLI argument handling: mode exclusivity and configuration-loading
//! failures, all of which are rejected before any stage runs.

use crate::prelude::*;

#[test]
fn conflicting_mode_flags_exit_one_before_reading_config() {
    // No config file exists at this path at all - if the CLI read it
    // before checking flags, this would fail differently (and later).
    let missing_config = std::path::Path::new("/nonexistent/config.yaml");
    let output = rra_cmd(missing_config, &["--import-only", "--report-status"]).output().expect("run rra");
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stderr_string().contains("mutually exclusive"), "stderr: {}", output.stderr_string());
}

#[test]
fn missing_config_file_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("config.yaml");
    let output = rra_cmd(&missing, &[]).output().expect("run rra");
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stderr_string().contains("could not read config file"), "stderr: {}", output.stderr_string());
}

#[test]
fn malformed_yaml_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "not: [valid: yaml").unwrap();
    let output = rra_cmd(&path, &[]).output().expect("run rra");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn missing_required_key_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "run_records_dir: /tmp/x\n").unwrap();
    let output = rra_cmd(&path, &[]).output().expect("run rra");
    assert_eq!(output.status.code(), Some(1));
}
