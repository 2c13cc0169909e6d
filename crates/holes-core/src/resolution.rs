//! Per-hole validation before a resolution may be marked done.
//!
//! Every check runs and every failure is collected. The gate is purely
//! diagnostic: it never edits the document or the repository.

use crate::config::Config;
use crate::error::HolesError;
use crate::gate::{CheckResult, CheckStatus, GateIssue, IssueKind};
use crate::graph;
use crate::parser::Document;
use crate::paths;
use crate::runner::{TestOutcome, TestRunner, VersionControl};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const CHECK_GRAPH: &str = "graph state";
pub const CHECK_TESTS_EXIST: &str = "resolution tests exist";
pub const CHECK_TESTS_PASS: &str = "resolution tests pass";
pub const CHECK_BASELINE: &str = "characterization tests pass";
pub const CHECK_BRANCH: &str = "not on protected branch";
pub const CHECK_PROTECTED_PATH: &str = "protected path unchanged";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub hole_id: String,
    pub passed: bool,
    pub checks: Vec<CheckResult>,
    pub errors: Vec<GateIssue>,
}

impl ResolutionReport {
    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }

    pub fn has_issue(&self, kind: IssueKind) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }

    pub fn failed_checks(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks
            .iter()
            .filter(|c| c.status == CheckStatus::Failed)
    }
}

pub struct ResolutionContext<'a> {
    pub root: &'a Path,
    pub config: &'a Config,
    pub document: &'a Path,
    pub runner: &'a dyn TestRunner,
    pub vcs: &'a dyn VersionControl,
}

/// Accumulates check results and issues in order.
#[derive(Default)]
struct Collector {
    checks: Vec<CheckResult>,
    errors: Vec<GateIssue>,
}

impl Collector {
    fn record(&mut self, check: CheckResult) {
        self.checks.push(check);
    }

    fn fail(&mut self, check: CheckResult, issues: impl IntoIterator<Item = GateIssue>) {
        self.checks.push(check);
        self.errors.extend(issues);
    }
}

pub fn validate_resolution(ctx: &ResolutionContext, hole_id: &str) -> ResolutionReport {
    let mut c = Collector::default();

    check_graph_state(ctx, hole_id, &mut c);

    let resolution_dir = ctx.config.resolution_dir(ctx.root);
    let resolution_tests = check_tests_exist(ctx, &resolution_dir, hole_id, &mut c);

    if resolution_tests.is_empty() {
        c.record(CheckResult::skipped(CHECK_TESTS_PASS, "no resolution tests to run"));
    } else {
        let start = Instant::now();
        let outcome = ctx.runner.run(ctx.root, &resolution_tests);
        record_test_run(
            &mut c,
            CHECK_TESTS_PASS,
            &format!("resolution tests for {hole_id}"),
            outcome,
            start,
        );
    }

    check_baseline(ctx, &mut c);
    check_protected(ctx, &mut c);

    let passed = c.errors.is_empty();
    tracing::debug!(hole = hole_id, passed, errors = c.errors.len(), "resolution gate evaluated");
    ResolutionReport {
        hole_id: hole_id.to_string(),
        passed,
        checks: c.checks,
        errors: c.errors,
    }
}

fn check_graph_state(ctx: &ResolutionContext, hole_id: &str, c: &mut Collector) {
    let doc = match Document::load(ctx.document) {
        Ok(doc) => doc,
        Err(HolesError::DocumentNotFound(path)) => {
            let msg = format!("refactor document not found: {}", path.display());
            c.fail(
                CheckResult::failed(CHECK_GRAPH, &msg),
                [GateIssue::new(IssueKind::Structural, msg)],
            );
            return;
        }
        Err(e) => {
            let msg = format!("cannot read refactor document: {e}");
            c.fail(
                CheckResult::failed(CHECK_GRAPH, &msg),
                [GateIssue::new(IssueKind::Structural, msg)],
            );
            return;
        }
    };

    let Some(hole) = doc.get(hole_id) else {
        let msg = format!("hole {hole_id} is not defined in the refactor document");
        c.fail(
            CheckResult::failed(CHECK_GRAPH, &msg),
            [GateIssue::new(IssueKind::Structural, msg)],
        );
        return;
    };

    let mut issues = Vec::new();
    let missing: Vec<&str> = hole
        .dependencies
        .iter()
        .filter(|d| !doc.contains(d))
        .map(String::as_str)
        .collect();
    for dep in &missing {
        issues.push(GateIssue::new(
            IssueKind::DanglingDependency,
            format!("{hole_id} depends on {dep}, which is not defined in the document"),
        ));
    }
    let unresolved: Vec<&str> = graph::blockers(&doc, hole);
    if !unresolved.is_empty() {
        issues.push(GateIssue::new(
            IssueKind::UnresolvedDependency,
            format!(
                "{hole_id} depends on unresolved holes: {}",
                unresolved.join(", ")
            ),
        ));
    }

    if issues.is_empty() {
        let detail = if hole.is_resolved() {
            format!("{hole_id} is already marked resolved; re-validating")
        } else {
            format!("{hole_id} is {} with all dependencies resolved", hole.status)
        };
        c.record(CheckResult::passed(CHECK_GRAPH, detail));
    } else {
        let detail = issues
            .iter()
            .map(|i| i.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        c.fail(CheckResult::failed(CHECK_GRAPH, detail), issues);
    }
}

fn check_tests_exist(
    ctx: &ResolutionContext,
    dir: &Path,
    hole_id: &str,
    c: &mut Collector,
) -> Vec<PathBuf> {
    let prefix = &ctx.config.test_prefix;
    let suffix = &ctx.config.test_suffix;
    match paths::list_resolution_tests(dir, prefix, suffix, hole_id) {
        Ok(found) if !found.is_empty() => {
            let names = found
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(", ");
            c.record(CheckResult::passed(CHECK_TESTS_EXIST, names));
            found
        }
        Ok(_) => {
            let msg = format!(
                "no resolution tests found for {hole_id} (expected {}/{prefix}{}*{suffix})",
                dir.display(),
                hole_id.to_lowercase()
            );
            c.fail(
                CheckResult::failed(CHECK_TESTS_EXIST, &msg),
                [GateIssue::new(IssueKind::MissingTests, msg)],
            );
            Vec::new()
        }
        Err(e) => {
            let msg = format!(
                "no resolution tests found for {hole_id}: cannot read {}: {e}",
                dir.display()
            );
            c.fail(
                CheckResult::failed(CHECK_TESTS_EXIST, &msg),
                [GateIssue::new(IssueKind::MissingTests, msg)],
            );
            Vec::new()
        }
    }
}

fn check_baseline(ctx: &ResolutionContext, c: &mut Collector) {
    let dir = ctx.config.baseline_dir(ctx.root);
    let config = ctx.config;
    let modules = match paths::list_test_modules(&dir, &config.test_prefix, &config.test_suffix) {
        Ok(m) => m,
        Err(e) => {
            let msg = format!("cannot read {}: {e}", dir.display());
            c.fail(
                CheckResult::failed(CHECK_BASELINE, &msg),
                [GateIssue::new(IssueKind::MissingTests, msg)],
            );
            return;
        }
    };
    if modules.is_empty() {
        let msg = format!("no characterization tests in {}", dir.display());
        c.fail(
            CheckResult::failed(CHECK_BASELINE, &msg),
            [GateIssue::new(IssueKind::MissingTests, msg)],
        );
        return;
    }
    let start = Instant::now();
    let outcome = ctx.runner.run(ctx.root, &modules);
    record_test_run(
        c,
        CHECK_BASELINE,
        "characterization tests (observable behavior changed)",
        outcome,
        start,
    );
}

fn record_test_run(
    c: &mut Collector,
    name: &str,
    what: &str,
    outcome: TestOutcome,
    start: Instant,
) {
    let ms = start.elapsed().as_millis() as u64;
    match outcome {
        TestOutcome::Passed { .. } => c.record(CheckResult::passed(name, "passed").timed(ms)),
        TestOutcome::Failed { output, exit } => {
            let msg = format!("{what} failed: {exit}");
            c.fail(
                CheckResult::failed(name, &exit).timed(ms),
                [GateIssue::new(IssueKind::TestFailure, msg).with_output(output)],
            );
        }
        TestOutcome::TimedOut { seconds } => {
            let msg = format!("{what} timed out after {seconds}s");
            c.fail(
                CheckResult::failed(name, "timed out").timed(ms),
                [GateIssue::new(IssueKind::TimedOut, msg)],
            );
        }
        TestOutcome::Error { message } => {
            let msg = format!("{what} could not run: {message}");
            c.fail(
                CheckResult::failed(name, &message).timed(ms),
                [GateIssue::new(IssueKind::TestFailure, msg)],
            );
        }
    }
}

fn vcs_issue(e: HolesError) -> GateIssue {
    match e {
        HolesError::TimedOut { .. } => GateIssue::new(IssueKind::TimedOut, e.to_string()),
        other => GateIssue::new(IssueKind::VcsError, other.to_string()),
    }
}

fn check_protected(ctx: &ResolutionContext, c: &mut Collector) {
    let protected = ctx.config.protected_branch.as_str();

    match ctx.vcs.current_branch() {
        Ok(branch) if branch == protected => {
            let msg = format!(
                "working on protected branch '{protected}'; resolve holes on a refactor branch"
            );
            c.fail(
                CheckResult::failed(CHECK_BRANCH, &msg),
                [GateIssue::new(IssueKind::ProtectedPathViolation, msg)],
            );
        }
        Ok(branch) => c.record(CheckResult::passed(CHECK_BRANCH, format!("on '{branch}'"))),
        Err(e) => {
            let issue = vcs_issue(e);
            c.fail(CheckResult::failed(CHECK_BRANCH, &issue.message), [issue]);
        }
    }

    let path = &ctx.config.protected_path;
    match ctx.vcs.changed_paths(protected, path) {
        Ok(changed) if changed.is_empty() => c.record(CheckResult::passed(
            CHECK_PROTECTED_PATH,
            format!("{} identical to '{protected}'", path.display()),
        )),
        Ok(changed) => {
            let msg = format!(
                "protected path {} differs from '{protected}': {}",
                path.display(),
                changed.join(", ")
            );
            c.fail(
                CheckResult::failed(CHECK_PROTECTED_PATH, &msg),
                [GateIssue::new(IssueKind::ProtectedPathViolation, msg)],
            );
        }
        Err(e) => {
            let issue = vcs_issue(e);
            c.fail(
                CheckResult::failed(CHECK_PROTECTED_PATH, &issue.message),
                [issue],
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::fake::{FakeRunner, FakeVcs};
    use tempfile::TempDir;

    const DOC: &str = "\
### H1_current
**Question**: q
**Dependencies**: None
**Status**: resolved

### R1_target
**Question**: q
**Dependencies**: H1_current
**Status**: in_progress

### R2_next
**Question**: q
**Dependencies**: R1_target
**Status**: pending
";

    struct Project {
        dir: TempDir,
        config: Config,
    }

    impl Project {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            std::fs::write(dir.path().join("REFACTOR_IR.md"), DOC).unwrap();
            let base = dir.path().join("tests/characterization");
            let res = dir.path().join("tests/resolution");
            std::fs::create_dir_all(&base).unwrap();
            std::fs::create_dir_all(&res).unwrap();
            std::fs::write(base.join("test_behavior.py"), "").unwrap();
            std::fs::write(res.join("test_r1_target.py"), "").unwrap();
            std::fs::write(res.join("test_r2_next.py"), "").unwrap();
            Self {
                dir,
                config: Config::default(),
            }
        }

        fn root(&self) -> &Path {
            self.dir.path()
        }

        fn validate(&self, id: &str, runner: &FakeRunner, vcs: &FakeVcs) -> ResolutionReport {
            let doc = self.config.document_path(self.root());
            let ctx = ResolutionContext {
                root: self.root(),
                config: &self.config,
                document: &doc,
                runner,
                vcs,
            };
            validate_resolution(&ctx, id)
        }

        fn runner(&self) -> FakeRunner {
            FakeRunner::passing(self.config.resolution_dir(self.root()))
        }
    }

    #[test]
    fn all_checks_pass() {
        let p = Project::new();
        let runner = p.runner();
        let report = p.validate("R1_target", &runner, &FakeVcs::on_branch("refactor/errors"));
        assert!(report.passed, "errors: {:?}", report.errors);
        assert_eq!(report.checks.len(), 6);
        assert!(report
            .checks
            .iter()
            .all(|c| c.status == CheckStatus::Passed));
        // resolution run, then baseline run
        assert_eq!(runner.calls.borrow().len(), 2);
        assert!(runner.calls.borrow()[0][0].ends_with("test_r1_target.py"));
    }

    #[test]
    fn missing_resolution_tests_always_reported() {
        let p = Project::new();
        std::fs::remove_file(p.root().join("tests/resolution/test_r1_target.py")).unwrap();
        let runner = p.runner();
        let report = p.validate("R1_target", &runner, &FakeVcs::on_branch("refactor/x"));
        assert!(!report.passed);
        assert!(report.has_issue(IssueKind::MissingTests));
        assert!(report
            .errors
            .iter()
            .any(|e| e.message.starts_with("no resolution tests found for R1_target")));
        assert_eq!(
            report.check(CHECK_TESTS_PASS).unwrap().status,
            CheckStatus::Skipped
        );
        // baseline still ran
        assert_eq!(runner.calls.borrow().len(), 1);
    }

    #[test]
    fn fixture_named_like_a_test_is_not_run() {
        let p = Project::new();
        let res = p.root().join("tests/resolution");
        std::fs::remove_file(res.join("test_r1_target.py")).unwrap();
        std::fs::write(res.join("test_r1_target.json"), "{}").unwrap();
        let runner = p.runner();
        let report = p.validate("R1_target", &runner, &FakeVcs::on_branch("refactor/x"));
        assert!(report.has_issue(IssueKind::MissingTests));
        assert!(report
            .errors
            .iter()
            .any(|e| e.message.ends_with("test_r1_target*.py)")));
        let calls = runner.calls.borrow();
        assert!(calls.iter().flatten().all(|t| t.extension() != Some("json".as_ref())));
    }

    #[test]
    fn missing_resolution_tests_reported_even_when_everything_else_fails() {
        let dir = TempDir::new().unwrap();
        let config = Config::default();
        let doc = config.document_path(dir.path());
        let runner = FakeRunner::passing(config.resolution_dir(dir.path()));
        let vcs = FakeVcs {
            branch: Err(HolesError::Vcs("not a git repository".into())),
            changed: Vec::new(),
            stat: Default::default(),
        };
        let ctx = ResolutionContext {
            root: dir.path(),
            config: &config,
            document: &doc,
            runner: &runner,
            vcs: &vcs,
        };
        let report = validate_resolution(&ctx, "R7");
        assert!(!report.passed);
        assert!(report
            .errors
            .iter()
            .any(|e| e.message.starts_with("no resolution tests found for R7")));
        assert!(report.has_issue(IssueKind::Structural));
        assert!(report.has_issue(IssueKind::VcsError));
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn failing_resolution_tests_carry_output() {
        let p = Project::new();
        let mut runner = p.runner();
        runner.resolution = TestOutcome::Failed {
            output: "AssertionError: expected Result".into(),
            exit: "exited with code 1".into(),
        };
        let report = p.validate("R1_target", &runner, &FakeVcs::on_branch("refactor/x"));
        assert!(!report.passed);
        let issue = report
            .errors
            .iter()
            .find(|e| e.kind == IssueKind::TestFailure)
            .unwrap();
        assert_eq!(
            issue.message,
            "resolution tests for R1_target failed: exited with code 1"
        );
        assert_eq!(issue.output.as_deref(), Some("AssertionError: expected Result"));
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn baseline_regression_fails() {
        let p = Project::new();
        let mut runner = p.runner();
        runner.baseline = TestOutcome::Failed {
            output: "test_behavior FAILED".into(),
            exit: "exited with code 1".into(),
        };
        let report = p.validate("R1_target", &runner, &FakeVcs::on_branch("refactor/x"));
        assert!(!report.passed);
        assert_eq!(
            report.check(CHECK_BASELINE).unwrap().status,
            CheckStatus::Failed
        );
        assert_eq!(
            report.check(CHECK_TESTS_PASS).unwrap().status,
            CheckStatus::Passed
        );
    }

    #[test]
    fn timeouts_are_a_distinct_kind() {
        let p = Project::new();
        let mut runner = p.runner();
        runner.baseline = TestOutcome::TimedOut { seconds: 600 };
        let vcs = FakeVcs {
            branch: Err(HolesError::TimedOut {
                command: "git rev-parse --abbrev-ref HEAD".into(),
                seconds: 30,
            }),
            changed: Vec::new(),
            stat: Default::default(),
        };
        let report = p.validate("R1_target", &runner, &vcs);
        assert!(!report.passed);
        let timeouts = report
            .errors
            .iter()
            .filter(|e| e.kind == IssueKind::TimedOut)
            .count();
        // baseline + branch + protected path
        assert_eq!(timeouts, 3);
        assert!(!report.has_issue(IssueKind::TestFailure));
    }

    #[test]
    fn protected_branch_is_rejected() {
        let p = Project::new();
        let runner = p.runner();
        let report = p.validate("R1_target", &runner, &FakeVcs::on_branch("main"));
        assert!(!report.passed);
        assert!(report.has_issue(IssueKind::ProtectedPathViolation));
        assert_eq!(report.failed_checks().count(), 1);
    }

    #[test]
    fn protected_path_changes_are_rejected() {
        let p = Project::new();
        let runner = p.runner();
        let mut vcs = FakeVcs::on_branch("refactor/x");
        vcs.changed = vec![".beads/issues.jsonl".into()];
        let report = p.validate("R1_target", &runner, &vcs);
        assert!(!report.passed);
        let issue = &report.errors[0];
        assert_eq!(issue.kind, IssueKind::ProtectedPathViolation);
        assert!(issue.message.contains(".beads/issues.jsonl"));
    }

    #[test]
    fn unresolved_dependency_fails_graph_check() {
        let p = Project::new();
        let runner = p.runner();
        let report = p.validate("R2_next", &runner, &FakeVcs::on_branch("refactor/x"));
        assert!(!report.passed);
        assert!(report.has_issue(IssueKind::UnresolvedDependency));
        assert_eq!(
            report.check(CHECK_GRAPH).unwrap().detail,
            "R2_next depends on unresolved holes: R1_target"
        );
    }

    #[test]
    fn unknown_hole_is_structural() {
        let p = Project::new();
        std::fs::write(p.root().join("tests/resolution/test_r9.py"), "").unwrap();
        let runner = p.runner();
        let report = p.validate("R9", &runner, &FakeVcs::on_branch("refactor/x"));
        assert!(!report.passed);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, IssueKind::Structural);
    }

    #[test]
    fn gate_does_not_touch_the_document() {
        let p = Project::new();
        let runner = p.runner();
        let path = p.root().join("REFACTOR_IR.md");
        let before = std::fs::read(&path).unwrap();
        let _ = p.validate("R1_target", &runner, &FakeVcs::on_branch("main"));
        let _ = p.validate("R2_next", &runner, &FakeVcs::on_branch("refactor/x"));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }
}
