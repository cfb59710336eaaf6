//! Integration tests for the slat CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper to get a slat command
fn slat() -> Command {
    Command::cargo_bin("slat").unwrap()
}

/// Helper to write a script into a temp directory
fn write_script(tmp: &TempDir, name: &str, source: &str) -> PathBuf {
    let path = tmp.path().join(name);
    fs::write(&path, source).unwrap();
    path
}

const LINEAR_IM: &str = r#"
- title: linear hazard
- detfn: {id: F, type: linear, x: [0, 1, 2], y: [0, 10, 20]}
- im: {id: IM_1, function: F}
- recorder: {id: R, kind: imrate, target: IM_1, at: [0, 1, 2]}
- analyze
"#;

const BUILDING: &str = r#"
- detfn: {id: HAZARD, type: hyperbolic, parameters: [1221, 29.8, 62.2]}
- im: {id: IM_1, function: HAZARD}
- detfn: {id: MU_EDP, type: power law, parameters: [0.02, 1.0]}
- detfn: {id: SIGMA_EDP, type: power law, parameters: [0.3, 0.0]}
- probfn: {id: EDP_FN, mu: {function: MU_EDP, role: median_x}, sigma: {function: SIGMA_EDP, role: sd_ln_x}}
- edp: {id: EDP_1, im: IM_1, function: EDP_FN}
- fragfn: {id: FRAG_1, states: [[0.0062, 0.4], [0.0230, 0.4]]}
- lossfn: {id: COST_1, states: [[0.03, 0.4], [0.08, 0.4]]}
- compgroup: {id: CG_1, edp: EDP_1, fragfn: FRAG_1, cost: COST_1, count: 10}
- structure: {id: BLDG, groups: [CG_1]}
"#;

// ============================================================================
// Run Command Tests
// ============================================================================

#[test]
fn test_run_prints_imrate_table() {
    let tmp = TempDir::new().unwrap();
    let script = write_script(&tmp, "imrate.yaml", LINEAR_IM);

    let output = slat().arg("run").arg(&script).output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], format!("{:>15}{:>15}", "IM_1", "lambda"));
    assert_eq!(lines[2], format!("{:>15}{:>15}", "1.0", "10.0"));
}

#[test]
fn test_run_csv_format() {
    let tmp = TempDir::new().unwrap();
    let script = write_script(&tmp, "imrate.yaml", LINEAR_IM);

    slat()
        .args(["run", "--format", "csv"])
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("IM_1,lambda\n0.0,0.0\n"));
}

#[test]
fn test_run_width_flag() {
    let tmp = TempDir::new().unwrap();
    let script = write_script(&tmp, "imrate.yaml", LINEAR_IM);

    slat()
        .args(["run", "--width", "8"])
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("{:>8}{:>8}\n", "2.0", "20.0")));
}

#[test]
fn test_run_dsrate_has_state_columns() {
    let tmp = TempDir::new().unwrap();
    let source = format!(
        "{}- recorder: {{id: R, kind: dsrate, target: CG_1}}\n- analyze\n",
        BUILDING
    );
    let script = write_script(&tmp, "dsrate.yaml", &source);

    let output = slat().arg("run").arg(&script).output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    let header: Vec<&str> = lines[0].split_whitespace().collect();
    assert_eq!(header, vec!["DS1", "DS2", "E(DS)"]);
    let values: Vec<f64> = lines[1]
        .split_whitespace()
        .map(|v| v.parse().unwrap())
        .collect();
    assert_eq!(values.len(), 3);
    assert!(values.iter().all(|v| *v >= 0.0));
    assert!(((values[0] + values[1]) - values[2]).abs() <= 1e-5 * values[2]);
}

#[test]
fn test_run_file_truncates_then_appends() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("results");
    fs::create_dir(&out).unwrap();

    let truncating = LINEAR_IM.replace(
        "at: [0, 1, 2]}",
        "at: [0, 1, 2], filename: imrate}",
    );
    let script = write_script(&tmp, "truncate.yaml", &truncating);
    for _ in 0..2 {
        slat()
            .args(["run", "--output-dir"])
            .arg(&out)
            .arg(&script)
            .assert()
            .success()
            .stdout(predicate::str::is_empty());
    }
    let written = fs::read_to_string(out.join("imrate.csv")).unwrap();
    assert_eq!(written.lines().count(), 4);

    let appending = LINEAR_IM.replace(
        "at: [0, 1, 2]}",
        "at: [0, 1, 2], filename: imrate, append: true}",
    );
    let script = write_script(&tmp, "append.yaml", &appending);
    slat()
        .args(["run", "--output-dir"])
        .arg(&out)
        .arg(&script)
        .assert()
        .success();
    let written = fs::read_to_string(out.join("imrate.csv")).unwrap();
    assert_eq!(written.lines().count(), 8);
}

#[test]
fn test_run_directory_in_sorted_order() {
    let tmp = TempDir::new().unwrap();
    let second = LINEAR_IM.replace("id: R,", "id: R, filename: second,");
    write_script(&tmp, "b.yaml", &second);
    write_script(&tmp, "a.yaml", LINEAR_IM);

    slat()
        .args(["run", "--output-dir"])
        .arg(tmp.path())
        .arg(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Ran 2 script(s)"));
    assert!(tmp.path().join("second.csv").exists());
}

#[test]
fn test_run_undefined_reference_fails() {
    let tmp = TempDir::new().unwrap();
    let script = write_script(&tmp, "bad.yaml", "- im: {id: IM_1, function: MISSING}\n");

    slat()
        .arg("run")
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("MISSING"));
}

#[test]
fn test_run_syntax_error_is_reported() {
    let tmp = TempDir::new().unwrap();
    let script = write_script(&tmp, "broken.yaml", "- detfn: {id: F, type: linear\n- analyze\n");

    slat()
        .arg("run")
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("script syntax error"));
}

#[test]
fn test_run_unknown_command_is_reported() {
    let tmp = TempDir::new().unwrap();
    let script = write_script(&tmp, "unknown.yaml", "- plot: {id: P}\n");

    slat()
        .arg("run")
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("plot"));
}

#[test]
fn test_run_missing_path() {
    slat()
        .args(["run", "/nonexistent/slat/script.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No such file"));
}

// ============================================================================
// Check Command Tests
// ============================================================================

#[test]
fn test_check_passes_without_output() {
    let tmp = TempDir::new().unwrap();
    let script = write_script(&tmp, "imrate.yaml", LINEAR_IM);

    slat()
        .arg("check")
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("All scripts passed"))
        .stdout(predicate::str::contains("lambda").not());
}

#[test]
fn test_check_undefined_reference_names_id() {
    let tmp = TempDir::new().unwrap();
    write_script(&tmp, "good.yaml", LINEAR_IM);
    write_script(
        &tmp,
        "bad.yaml",
        "- detfn: {id: F, type: linear, x: [0, 1], y: [0, 1]}\n- im: {id: IM_1, function: G}\n",
    );

    slat()
        .arg("check")
        .arg(tmp.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("Files failed:"))
        .stdout(predicate::str::contains("'G'"));
}

#[test]
fn test_check_recorder_without_grid() {
    let tmp = TempDir::new().unwrap();
    let script = write_script(
        &tmp,
        "nogrid.yaml",
        &LINEAR_IM.replace(", at: [0, 1, 2]", ""),
    );

    slat()
        .arg("check")
        .arg(&script)
        .assert()
        .failure()
        .stdout(predicate::str::contains("imrate"));
}

// ============================================================================
// List Command Tests
// ============================================================================

#[test]
fn test_list_table() {
    let tmp = TempDir::new().unwrap();
    let script = write_script(&tmp, "building.yaml", BUILDING);

    slat()
        .arg("list")
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("EDP_1"))
        .stdout(predicate::str::contains("BLDG"))
        .stdout(predicate::str::contains("compgroup"));
}

#[test]
fn test_list_json_filtered_by_kind() {
    let tmp = TempDir::new().unwrap();
    let script = write_script(&tmp, "building.yaml", BUILDING);

    let output = slat()
        .args(["list", "--format", "json", "--kind", "detfn"])
        .arg(&script)
        .output()
        .unwrap();
    assert!(output.status.success());

    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let ids: Vec<&str> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["HAZARD", "MU_EDP", "SIGMA_EDP"]);
}

#[test]
fn test_list_csv_and_count() {
    let tmp = TempDir::new().unwrap();
    let script = write_script(&tmp, "building.yaml", BUILDING);

    slat()
        .args(["list", "--format", "csv"])
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("kind,id,summary\n"));

    slat()
        .args(["list", "--count"])
        .arg(&script)
        .assert()
        .success()
        .stdout("10\n");
}

// ============================================================================
// Misc
// ============================================================================

#[test]
fn test_completions_bash() {
    slat()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("slat"));
}

#[test]
fn test_help_lists_commands() {
    slat()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("list"));
}
