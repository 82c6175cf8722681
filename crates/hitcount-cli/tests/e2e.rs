//! End-to-end tests for the hitcount binary.
//!
//! Only the non-interactive paths are driven here; the interactive control
//! is covered by the simulator tests in the library crates.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

/// Get a Command for the hitcount binary with host env cleared.
#[allow(deprecated)]
fn hitcount_cmd() -> Command {
    let mut cmd = Command::cargo_bin("hitcount").unwrap();
    cmd.env_remove("HITCOUNT_FIELD")
        .env_remove("HITCOUNT_WORK_ITEM")
        .env_remove("HITCOUNT_OPTIONS")
        .env_remove("HITCOUNT_LOG_FILE");
    cmd
}

fn work_item(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

mod show {
    use super::*;

    #[test]
    fn test_prints_bound_value() {
        let file = work_item(r#"{"id": 7, "fields": {"Custom.HitCount": 12}}"#);
        hitcount_cmd()
            .arg("--work-item")
            .arg(file.path())
            .args(["--field", "Custom.HitCount", "show"])
            .assert()
            .success()
            .stdout("12\n");
    }

    #[test]
    fn test_coerces_string_and_missing_values() {
        let file = work_item(r#"{"id": 7, "fields": {"Custom.HitCount": " 4 "}}"#);
        hitcount_cmd()
            .arg("-w")
            .arg(file.path())
            .args(["-f", "Custom.HitCount", "show"])
            .assert()
            .success()
            .stdout("4\n");

        hitcount_cmd()
            .arg("-w")
            .arg(file.path())
            .args(["-f", "Custom.Other", "show"])
            .assert()
            .success()
            .stdout("0\n");
    }

    #[test]
    fn test_field_from_environment() {
        let file = work_item(r#"{"id": 7, "fields": {"Custom.HitCount": 3}}"#);
        hitcount_cmd()
            .env("HITCOUNT_FIELD", "Custom.HitCount")
            .arg("-w")
            .arg(file.path())
            .arg("show")
            .assert()
            .success()
            .stdout("3\n");
    }
}

mod errors {
    use super::*;

    #[test]
    fn test_missing_field_is_configuration_error() {
        let file = work_item(r#"{"id": 7, "fields": {}}"#);
        hitcount_cmd()
            .arg("-w")
            .arg(file.path())
            .arg("show")
            .assert()
            .failure()
            .stderr(predicate::str::contains("FieldName input is required"));
    }

    #[test]
    fn test_missing_work_item_file() {
        hitcount_cmd()
            .args(["-w", "/nonexistent/bug.json", "-f", "x", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("cannot open work item"));
    }

    #[test]
    fn test_malformed_work_item() {
        let file = work_item("[1, 2");
        hitcount_cmd()
            .arg("-w")
            .arg(file.path())
            .args(["-f", "x", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid work item"));
    }

    #[test]
    fn test_bad_options_file() {
        let file = work_item(r#"{"id": 7, "fields": {}}"#);
        let mut options = NamedTempFile::new().unwrap();
        options.write_all(b"debounce_ms = \"later\"\n").unwrap();
        hitcount_cmd()
            .arg("-w")
            .arg(file.path())
            .arg("--options")
            .arg(options.path())
            .args(["-f", "x", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid options"));
    }

    #[test]
    fn test_work_item_is_required() {
        hitcount_cmd()
            .arg("show")
            .assert()
            .failure()
            .stderr(predicate::str::contains("--work-item"));
    }
}

mod logging {
    use super::*;

    #[test]
    fn test_log_file_receives_events() {
        let file = work_item(r#"{"id": 7, "fields": {"Custom.HitCount": 1}}"#);
        let log = NamedTempFile::new().unwrap();
        hitcount_cmd()
            .arg("-w")
            .arg(file.path())
            .arg("--log-file")
            .arg(log.path())
            .args(["-f", "Custom.HitCount", "-v", "show"])
            .env_remove("RUST_LOG")
            .assert()
            .success();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        assert!(contents.contains("work item opened"));
    }
}
