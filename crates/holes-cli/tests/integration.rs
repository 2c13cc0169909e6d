#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const MINIMAL: &str = "\
# Refactor IR

## Constraints
- Must Preserve: observable behavior
- Must Improve: module boundaries
- Must Maintain: throughput

## Holes

### H1_current
**Question**: How are errors handled today?
**Dependencies**: None
**Status**: resolved

### R1_target
**Question**: What should the error strategy be?
**Dependencies**: H1_current
**Status**: pending

## Dependency Graph
H1_current -> R1_target
";

fn holes(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("holes").unwrap();
    cmd.current_dir(dir.path())
        .env("HOLES_ROOT", dir.path())
        .env_remove("RUST_LOG");
    cmd
}

/// A project with the minimal valid document, one characterization test and
/// a test command that always succeeds.
fn init_project(doc: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("REFACTOR_IR.md"), doc).unwrap();
    let baseline = dir.path().join("tests/characterization");
    std::fs::create_dir_all(&baseline).unwrap();
    std::fs::write(baseline.join("test_behavior.py"), "").unwrap();
    std::fs::create_dir_all(dir.path().join(".holes")).unwrap();
    std::fs::write(
        dir.path().join(".holes/config.yaml"),
        "test_command: \"true {targets}\"\n",
    )
    .unwrap();
    dir
}

fn read_doc(dir: &TempDir) -> String {
    std::fs::read_to_string(dir.path().join("REFACTOR_IR.md")).unwrap()
}

// ---------------------------------------------------------------------------
// holes discovery-check
// ---------------------------------------------------------------------------

#[test]
fn discovery_passes_on_minimal_document() {
    let dir = init_project(MINIMAL);
    holes(&dir)
        .arg("discovery-check")
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Discovery complete"));
}

#[test]
fn discovery_json_shape() {
    let dir = init_project(MINIMAL);
    let out = holes(&dir)
        .args(["discovery-check", "--json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(value["gate"], "discovery");
    assert_eq!(value["passed"], true);
    assert_eq!(value["issues"].as_array().unwrap().len(), 0);
    assert!(value["warnings"].is_array());
}

#[test]
fn discovery_fails_without_document() {
    let dir = TempDir::new().unwrap();
    holes(&dir)
        .arg("discovery-check")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("refactor document not found"))
        .stdout(predicate::str::contains("characterization test directory not found"))
        .stderr(predicate::str::contains("error:").not());
}

#[test]
fn discovery_reports_every_missing_constraint_category() {
    let doc = MINIMAL
        .replace("- Must Improve: module boundaries\n", "")
        .replace("- Must Maintain: throughput\n", "");
    let dir = init_project(&doc);
    let out = holes(&dir)
        .args(["--json", "discovery-check"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(value["passed"], false);
    assert_eq!(value["issues"].as_array().unwrap().len(), 2);
}

#[test]
fn discovery_ignores_fixtures_in_test_directory() {
    let dir = init_project(MINIMAL);
    let baseline = dir.path().join("tests/characterization");
    std::fs::remove_file(baseline.join("test_behavior.py")).unwrap();
    std::fs::write(baseline.join("test_golden.json"), "{}").unwrap();
    holes(&dir)
        .arg("discovery-check")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("no characterization tests (test_*.py)"));
}

#[test]
fn discovery_honors_configured_test_suffix() {
    let dir = init_project(MINIMAL);
    let baseline = dir.path().join("tests/characterization");
    std::fs::remove_file(baseline.join("test_behavior.py")).unwrap();
    std::fs::write(baseline.join("test_behavior.sh"), "").unwrap();
    std::fs::write(
        dir.path().join(".holes/config.yaml"),
        "test_command: \"true {targets}\"\ntest_suffix: \".sh\"\n",
    )
    .unwrap();
    holes(&dir)
        .arg("discovery-check")
        .assert()
        .success();
}

#[test]
fn discovery_tests_flag_overrides_config() {
    let dir = init_project(MINIMAL);
    holes(&dir)
        .args(["discovery-check", "--tests", "tests/missing"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("characterization test directory not found"));
}

// ---------------------------------------------------------------------------
// holes next-hole
// ---------------------------------------------------------------------------

#[test]
fn next_hole_suggests_first_resolvable() {
    let dir = init_project(MINIMAL);
    holes(&dir)
        .arg("next-hole")
        .assert()
        .success()
        .stdout(predicate::str::contains("Progress: 1/2 resolved (50%)"))
        .stdout(predicate::str::contains("Resolvable (1):"))
        .stdout(predicate::str::contains("Next: R1_target"));
}

#[test]
fn next_hole_is_deterministic() {
    let dir = init_project(MINIMAL);
    let first = holes(&dir).arg("next-hole").output().unwrap();
    let second = holes(&dir).arg("next-hole").output().unwrap();
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn next_hole_blocks_on_unresolved_dependency() {
    let doc = MINIMAL.replace("**Status**: resolved", "**Status**: pending");
    let dir = init_project(&doc);
    let out = holes(&dir)
        .args(["next-hole", "--json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(value["next"], "H1_current");
    assert_eq!(value["blocked"][0]["id"], "R1_target");
    assert_eq!(value["blocked"][0]["blocked_by"][0], "H1_current");
}

#[test]
fn next_hole_flags_dangling_dependency_but_keeps_it_resolvable() {
    let doc = "\
### R1
**Question**: q
**Dependencies**: X9
**Status**: pending
";
    let dir = init_project(doc);
    holes(&dir)
        .arg("next-hole")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "✗ dangling dependency: R1 depends on X9, which is not defined in the document",
        ))
        .stdout(predicate::str::contains("Next: R1"));
}

#[test]
fn next_hole_show_all_lists_resolved() {
    let dir = init_project(MINIMAL);
    holes(&dir)
        .args(["next-hole", "--show-all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Resolved (1):"))
        .stdout(predicate::str::contains("H1_current"));
}

#[test]
fn next_hole_reports_missing_document() {
    let dir = TempDir::new().unwrap();
    holes(&dir)
        .arg("next-hole")
        .assert()
        .success()
        .stdout(predicate::str::contains("✗ refactor document not found"))
        .stderr(predicate::str::contains("error:").not());
}

#[test]
fn next_hole_marks_cycle_members() {
    let doc = "\
### R1
**Question**: q
**Dependencies**: R2
**Status**: pending

### R2
**Question**: q
**Dependencies**: R1
**Status**: pending
";
    let dir = init_project(doc);
    holes(&dir)
        .arg("next-hole")
        .assert()
        .success()
        .stdout(predicate::str::contains("✗ dependency cycle"))
        .stdout(predicate::str::contains("waiting on R2 (dependency cycle)"));

    let out = holes(&dir).args(["next-hole", "--json"]).output().unwrap();
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(value["blocked"][0]["in_cycle"], true);
}

// ---------------------------------------------------------------------------
// holes validate-resolution
// ---------------------------------------------------------------------------

#[test]
fn validate_reports_missing_resolution_tests() {
    let dir = init_project(MINIMAL);
    holes(&dir)
        .args(["validate-resolution", "R1_target"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("no resolution tests found for R1_target"))
        .stdout(predicate::str::contains("✓ graph state"))
        .stdout(predicate::str::contains("✓ characterization tests pass"))
        .stdout(predicate::str::is_match(r"✗ [1-3] of 6 checks failed").unwrap());
}

#[test]
fn validate_json_lists_errors() {
    let dir = init_project(MINIMAL);
    let out = holes(&dir)
        .args(["-j", "validate-resolution", "R1_target"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(value["hole_id"], "R1_target");
    assert_eq!(value["passed"], false);
    let kinds: Vec<&str> = value["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"missing_tests"));
}

#[test]
fn validate_rejects_malformed_id() {
    let dir = init_project(MINIMAL);
    holes(&dir)
        .args(["validate-resolution", "not-a-hole"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid hole id"));
}

// ---------------------------------------------------------------------------
// holes propagate
// ---------------------------------------------------------------------------

#[test]
fn propagate_lists_dependents_and_guidance() {
    let dir = init_project(MINIMAL);
    holes(&dir)
        .args(["propagate", "H1_current"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dependents of H1_current (1):"))
        .stdout(predicate::str::contains("R1_target"))
        .stdout(predicate::str::contains("Type constraints"))
        .stdout(predicate::str::contains("Resource constraints"))
        .stdout(predicate::str::contains("Test-data constraints"));
}

#[test]
fn propagate_leaf_is_idempotent() {
    let dir = init_project(MINIMAL);
    let first = holes(&dir).args(["propagate", "R1_target"]).output().unwrap();
    let second = holes(&dir).args(["propagate", "R1_target"]).output().unwrap();
    assert!(first.status.success());
    assert!(String::from_utf8_lossy(&first.stdout).contains("is a leaf"));
    assert_eq!(first.stdout, second.stdout);
    assert_eq!(read_doc(&dir), MINIMAL);
}

#[test]
fn propagate_reports_missing_document() {
    let dir = TempDir::new().unwrap();
    holes(&dir)
        .args(["propagate", "H1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("✗ refactor document not found"));

    let out = holes(&dir).args(["--json", "propagate", "H1"]).output().unwrap();
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert!(value["error"]
        .as_str()
        .unwrap()
        .starts_with("refactor document not found"));
}

#[test]
fn propagate_unknown_hole_warns() {
    let dir = init_project(MINIMAL);
    holes(&dir)
        .args(["propagate", "R9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("⚠ R9 is not defined"));
}

// ---------------------------------------------------------------------------
// holes generate-report
// ---------------------------------------------------------------------------

#[test]
fn generate_report_prints_sections() {
    let dir = init_project(MINIMAL);
    holes(&dir)
        .arg("generate-report")
        .assert()
        .success()
        .stdout(predicate::str::contains("# Refactor Report"))
        .stdout(predicate::str::contains("## Summary"))
        .stdout(predicate::str::contains("## Hole Resolution"))
        .stdout(predicate::str::contains("## Metrics"))
        .stdout(predicate::str::contains("**Not ready to merge.** 1 hole(s) remain unresolved."));
}

#[test]
fn generate_report_writes_output_file() {
    let dir = init_project(MINIMAL);
    holes(&dir)
        .args(["generate-report", "--output", "out/report.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Report written to"));
    let report = std::fs::read_to_string(dir.path().join("out/report.md")).unwrap();
    assert!(report.contains("## Recommendation"));
}

#[test]
fn generate_report_bare_output_uses_configured_file() {
    let dir = init_project(MINIMAL);
    holes(&dir)
        .args(["generate-report", "--output"])
        .assert()
        .success();
    assert!(dir.path().join("REFACTOR_REPORT.md").exists());
}

// ---------------------------------------------------------------------------
// holes mark
// ---------------------------------------------------------------------------

#[test]
fn mark_resolves_hole_and_completes_graph() {
    let dir = init_project(MINIMAL);
    holes(&dir)
        .args([
            "mark",
            "R1_target",
            "resolved",
            "--resolution",
            "thiserror in core, anyhow at the edge",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ R1_target is now resolved"));

    let doc = read_doc(&dir);
    assert!(doc.contains(
        "**Status**: resolved\n**Resolution**: thiserror in core, anyhow at the edge\n\n## Dependency Graph"
    ));

    holes(&dir)
        .arg("next-hole")
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ All holes resolved"));
}

#[test]
fn mark_rejects_backward_transition() {
    let dir = init_project(MINIMAL);
    holes(&dir)
        .args(["mark", "H1_current", "pending"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid transition"));
    assert_eq!(read_doc(&dir), MINIMAL);
}

#[test]
fn mark_rejects_unknown_status() {
    let dir = init_project(MINIMAL);
    holes(&dir)
        .args(["mark", "R1_target", "finished"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid status 'finished'"));
}
