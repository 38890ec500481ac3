// Copyright 2025 Cornell University
// released under MIT License

use assert_cmd::Command;
use predicates::prelude::*;

const TOOL_CONFIG: &str = r#"
build_system: edalize
tool: vcs
testbenches:
  alu_tb:
    toplevel: alu_top
    tests:
      basic_test:
        runtime_args: ["+TIMEOUT=1000"]
      extended_test: {}
  fifo_tb: {}
"#;

fn tbrun() -> Command {
    Command::cargo_bin("tbrun").unwrap()
}

fn write_config(dir: &tempfile::TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("tester.yml");
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn missing_config_file_fails() {
    tbrun()
        .args(["--config", "/nonexistent/tester.yml", "list-testbenches"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn invalid_yaml_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = write_config(&dir, "invalid: yaml: content:");
    tbrun()
        .args(["--config", config.to_str().unwrap(), "list-testbenches"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid YAML"));
}

#[test]
fn unsupported_build_system_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = write_config(&dir, "build_system: scons\n");
    tbrun()
        .args(["--config", config.to_str().unwrap(), "list-testbenches"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported build system: scons"));
}

#[test]
fn list_testbenches_from_config() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = write_config(&dir, TOOL_CONFIG);
    tbrun()
        .args(["--config", config.to_str().unwrap(), "list-testbenches"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Available testbenches:"))
        .stdout(predicate::str::contains("alu_tb"))
        .stdout(predicate::str::contains("fifo_tb"));
}

#[test]
fn list_tests_uses_default_testbench() {
    // no testbench given: falls back to the first in sorted order
    let dir = tempfile::TempDir::new().unwrap();
    let config = write_config(&dir, TOOL_CONFIG);
    tbrun()
        .args(["--config", config.to_str().unwrap(), "list-tests"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Available tests for alu_tb:"))
        .stdout(predicate::str::contains("basic_test"))
        .stdout(predicate::str::contains("extended_test"));
}

#[test]
fn list_tests_empty_testbench() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = write_config(&dir, TOOL_CONFIG);
    tbrun()
        .args(["--config", config.to_str().unwrap(), "list-tests", "fifo_tb"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No tests found for testbench 'fifo_tb'"));
}

#[test]
fn list_tests_unknown_testbench_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = write_config(&dir, TOOL_CONFIG);
    tbrun()
        .args(["--config", config.to_str().unwrap(), "list-tests", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown testbench: nope"));
}

#[test]
fn run_without_test_name_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = write_config(&dir, TOOL_CONFIG);
    tbrun()
        .args(["--config", config.to_str().unwrap(), "run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("test name is required"));
}

#[test]
fn run_rejects_invalid_verbosity() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = write_config(&dir, TOOL_CONFIG);
    tbrun()
        .args([
            "--config",
            config.to_str().unwrap(),
            "run",
            "alu_tb",
            "basic_test",
            "--verbosity",
            "LOUD",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--verbosity"));
}

#[test]
fn clean_removes_tool_work_dir() {
    let dir = tempfile::TempDir::new().unwrap();
    let work_root = dir.path().join("work");
    std::fs::create_dir_all(work_root.join("alu_tb")).unwrap();
    let config_text = format!("{}work_root: {}\n", TOOL_CONFIG, work_root.display());
    let config = write_config(&dir, &config_text);
    tbrun()
        .args(["--config", config.to_str().unwrap(), "clean", "alu_tb"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Successfully cleaned testbench 'alu_tb'"));
    assert!(!work_root.join("alu_tb").exists());
}

#[test]
fn makefile_build_with_stub_make() {
    // `true` accepts the make-style arguments and exits 0
    let dir = tempfile::TempDir::new().unwrap();
    let config = write_config(
        &dir,
        "build_system: makefile\nmake_command: \"true\"\ndefault_testbench: alu_tb\n",
    );
    tbrun()
        .args(["--config", config.to_str().unwrap(), "build"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Successfully built testbench 'alu_tb'"));
}

#[test]
fn makefile_run_failure_propagates() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = write_config(
        &dir,
        "build_system: makefile\nmake_command: \"false\"\ndefault_testbench: alu_tb\n",
    );
    tbrun()
        .args([
            "--config",
            config.to_str().unwrap(),
            "run",
            "alu_tb",
            "basic_test",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to execute command"));
}

#[test]
fn regress_writes_report_and_fails_when_tests_fail() {
    // the vcs binary does not exist here, so every test is recorded failed
    let dir = tempfile::TempDir::new().unwrap();
    let work_root = dir.path().join("work");
    let report_dir = dir.path().join("reports");
    let config_text = format!("{}work_root: {}\n", TOOL_CONFIG, work_root.display());
    let config = write_config(&dir, &config_text);
    tbrun()
        .args([
            "--config",
            config.to_str().unwrap(),
            "regress",
            "alu_tb",
            "--report-dir",
            report_dir.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("tests failed"));
    let reports: Vec<_> = std::fs::read_dir(&report_dir).unwrap().collect();
    assert_eq!(reports.len(), 1);
}
