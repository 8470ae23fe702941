use assert_cmd::Command;
use eegpower_rs::readers::edf::{EdfSignalHeader, EdfWriter};
use predicates::prelude::*;
use std::path::Path;

fn eegpower() -> Command {
    Command::cargo_bin("eegpower").unwrap()
}

fn write_edf(path: &Path, labels: &[&str], seconds: usize) {
    let headers = labels
        .iter()
        .map(|l| EdfSignalHeader::new(l, "uV", (-200.0, 200.0), 256))
        .collect();
    let mut writer = EdfWriter::new(path, "X", "Y", 1.0, headers).unwrap();
    for _ in 0..seconds {
        let record: Vec<Vec<f64>> = labels
            .iter()
            .enumerate()
            .map(|(ch, _)| {
                (0..256)
                    .map(|i| (10.0 + ch as f64) * (i as f64 * 0.2454).sin())
                    .collect()
            })
            .collect();
        writer.write_physical_record(&record).unwrap();
    }
    writer.finalize().unwrap();
}

// =============================================================================
// GENERAL
// =============================================================================

#[test]
fn test_no_args_shows_help() {
    eegpower()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_version_flag() {
    eegpower()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("eegpower"));
}

#[test]
fn test_help_flag() {
    eegpower()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("band-power"));
}

// =============================================================================
// BANDS SUBCOMMAND
// =============================================================================

#[test]
fn test_bands_table() {
    eegpower()
        .arg("bands")
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha"))
        .stdout(predicate::str::contains("High Gamma"))
        .stdout(predicate::str::contains("70-100"));
}

#[test]
fn test_bands_json() {
    let output = eegpower().args(["bands", "--json"]).assert().success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let names: Vec<&str> = parsed
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b.get("name").unwrap().as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["delta", "theta", "alpha", "beta", "gamma", "high_gamma"]);
}

// =============================================================================
// VALIDATE SUBCOMMAND
// =============================================================================

#[test]
fn test_validate_missing_file() {
    eegpower()
        .args(["validate", "--file", "/nonexistent/recording.edf"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_validate_unsupported_extension() {
    let tmp = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    eegpower()
        .args(["validate", "--file"])
        .arg(tmp.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unsupported"));
}

#[test]
fn test_validate_edf_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rec.edf");
    write_edf(&path, &["Fz", "Cz", "ECG"], 4);

    let output = eegpower()
        .args(["validate", "--json", "--file"])
        .arg(&path)
        .assert()
        .success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["supported"], true);
    assert_eq!(parsed["eeg_channels"], 2);
    assert_eq!(parsed["sample_rate"], 256.0);
    assert!(parsed["error"].is_null());
}

// =============================================================================
// INFO SUBCOMMAND
// =============================================================================

#[test]
fn test_info_edf() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rec.edf");
    write_edf(&path, &["Fz", "Cz", "EOG left"], 3);

    eegpower()
        .args(["info", "--file"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("256 Hz"))
        .stdout(predicate::str::contains("2 EEG"))
        .stdout(predicate::str::contains("1 EOG"));
}

#[test]
fn test_info_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rec.edf");
    write_edf(&path, &["Fz", "Cz"], 2);

    let output = eegpower()
        .args(["info", "--json", "--file"])
        .arg(&path)
        .assert()
        .success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["num_samples"], 512);
    assert_eq!(parsed["eeg_channels"], serde_json::json!(["Fz", "Cz"]));
}

// =============================================================================
// RUN ARGUMENT ERRORS
// =============================================================================

#[test]
fn test_run_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    eegpower()
        .args(["run", "--file", "/nonexistent/recording.fif", "--output-dir"])
        .arg(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_run_unknown_band() {
    eegpower()
        .args(["run", "--band", "ultraviolet"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unknown frequency band"));
}

#[test]
fn test_run_tmax_conflicts_with_full() {
    eegpower()
        .args(["run", "--tmax", "10", "--full"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_run_bad_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");
    std::fs::write(&config, "{ \"tmax\": \"soon\" }").unwrap();
    eegpower()
        .args(["run", "--config"])
        .arg(&config)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid configuration"));
}
