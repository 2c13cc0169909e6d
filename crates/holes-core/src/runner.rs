//! Capabilities the gates use to reach outside the process: running tests
//! and querying version control. Production implementations shell out; the
//! gates only see the traits, so tests substitute in-memory fakes.

use crate::config::Config;
use crate::error::{HolesError, Result};
use crate::process::{self, Exit, ProcessOutput};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use std::time::Duration;

// ---------------------------------------------------------------------------
// TestRunner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum TestOutcome {
    Passed { output: String },
    Failed { output: String, exit: String },
    TimedOut { seconds: u64 },
    /// The runner could not be started at all.
    Error { message: String },
}

pub trait TestRunner {
    /// Run the given test modules to completion and report the outcome.
    fn run(&self, root: &Path, targets: &[PathBuf]) -> TestOutcome;
}

/// Runs a configured shell command, substituting `{targets}`.
#[derive(Debug, Clone)]
pub struct ShellTestRunner {
    command: String,
    timeout: Option<Duration>,
}

impl ShellTestRunner {
    pub fn new(command: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.test_command.clone(), config.test_timeout())
    }

    /// Targets are made relative to `root` when possible and shell-quoted.
    pub fn render(&self, root: &Path, targets: &[PathBuf]) -> String {
        let joined = targets
            .iter()
            .map(|t| {
                let rel = t.strip_prefix(root).unwrap_or(t);
                process::shell_quote(&rel.to_string_lossy())
            })
            .collect::<Vec<_>>()
            .join(" ");
        self.command.replace("{targets}", &joined)
    }
}

impl TestRunner for ShellTestRunner {
    fn run(&self, root: &Path, targets: &[PathBuf]) -> TestOutcome {
        if self.command.trim().is_empty() {
            return TestOutcome::Error {
                message: "test command is empty".to_string(),
            };
        }
        let command = self.render(root, targets);
        tracing::debug!(%command, targets = targets.len(), "running tests");
        let out = process::run_shell(&command, root, self.timeout);
        tracing::debug!(
            exit = %out.describe_exit(),
            duration_ms = out.duration_ms,
            "tests finished"
        );
        outcome_from(out)
    }
}

fn outcome_from(out: ProcessOutput) -> TestOutcome {
    match &out.exit {
        Exit::TimedOut(d) => TestOutcome::TimedOut {
            seconds: d.as_secs(),
        },
        Exit::SpawnFailed(e) => TestOutcome::Error { message: e.clone() },
        Exit::Code(_) if out.success() => TestOutcome::Passed {
            output: out.combined(),
        },
        Exit::Code(_) => TestOutcome::Failed {
            output: out.combined(),
            exit: out.describe_exit(),
        },
    }
}

// ---------------------------------------------------------------------------
// VersionControl
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStat {
    pub files_changed: u64,
    pub insertions: u64,
    pub deletions: u64,
}

static SHORTSTAT_RE: OnceLock<Regex> = OnceLock::new();

fn shortstat_re() -> &'static Regex {
    SHORTSTAT_RE.get_or_init(|| {
        Regex::new(r"(?P<n>\d+) (?P<what>files? changed|insertions?\(\+\)|deletions?\(-\))")
            .unwrap()
    })
}

impl DiffStat {
    /// Parse `git diff --shortstat` output. Empty output is an empty diff.
    pub fn parse_shortstat(text: &str) -> DiffStat {
        let mut stat = DiffStat::default();
        for caps in shortstat_re().captures_iter(text) {
            let n: u64 = caps["n"].parse().unwrap_or(0);
            let what = &caps["what"];
            if what.starts_with("file") {
                stat.files_changed = n;
            } else if what.starts_with("insertion") {
                stat.insertions = n;
            } else {
                stat.deletions = n;
            }
        }
        stat
    }
}

pub trait VersionControl {
    fn current_branch(&self) -> Result<String>;

    /// Files under `path` that differ between `base` and the working tree,
    /// including untracked files. Empty means byte-identical.
    fn changed_paths(&self, base: &str, path: &Path) -> Result<Vec<String>>;

    fn diff_stat(&self, base: &str) -> Result<DiffStat>;
}

/// `git` invoked in the project root.
#[derive(Debug, Clone)]
pub struct Git {
    root: PathBuf,
    timeout: Option<Duration>,
}

impl Git {
    pub fn new(root: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            root: root.into(),
            timeout,
        }
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        let git = which::which("git").map_err(|_| HolesError::Vcs("git not found on PATH".into()))?;
        let mut cmd = Command::new(git);
        cmd.args(args).current_dir(&self.root);
        let label = format!("git {}", args.join(" "));
        tracing::debug!(command = %label, "querying version control");
        let out = process::run(cmd, self.timeout);
        match &out.exit {
            Exit::TimedOut(d) => Err(HolesError::TimedOut {
                command: label,
                seconds: d.as_secs(),
            }),
            Exit::SpawnFailed(e) => Err(HolesError::Vcs(format!("{label}: {e}"))),
            Exit::Code(_) if out.success() => Ok(out.stdout),
            Exit::Code(_) => Err(HolesError::Vcs(format!(
                "{label} {}: {}",
                out.describe_exit(),
                out.stderr.trim()
            ))),
        }
    }
}

impl VersionControl for Git {
    fn current_branch(&self) -> Result<String> {
        let out = self.git(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        Ok(out.trim().to_string())
    }

    fn changed_paths(&self, base: &str, path: &Path) -> Result<Vec<String>> {
        let path = path.to_string_lossy();
        let diff = self.git(&["diff", "--name-only", base, "--", &path])?;
        let untracked = self.git(&["ls-files", "--others", "--exclude-standard", "--", &path])?;
        let mut changed: Vec<String> = diff
            .lines()
            .chain(untracked.lines())
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        changed.sort();
        changed.dedup();
        Ok(changed)
    }

    fn diff_stat(&self, base: &str) -> Result<DiffStat> {
        let out = self.git(&["diff", "--shortstat", base])?;
        Ok(DiffStat::parse_shortstat(&out))
    }
}

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn render_substitutes_relative_quoted_targets() {
        let runner = ShellTestRunner::new("pytest -q {targets}", None);
        let root = Path::new("/proj");
        let cmd = runner.render(
            root,
            &[
                PathBuf::from("/proj/tests/resolution/test_r1.py"),
                PathBuf::from("/proj/tests/my dir/test_x.py"),
            ],
        );
        assert_eq!(
            cmd,
            "pytest -q tests/resolution/test_r1.py 'tests/my dir/test_x.py'"
        );
    }

    #[test]
    fn render_without_placeholder_is_verbatim() {
        let runner = ShellTestRunner::new("make test", None);
        assert_eq!(
            runner.render(Path::new("/p"), &[PathBuf::from("/p/t.py")]),
            "make test"
        );
    }

    #[test]
    fn shell_runner_pass_and_fail() {
        let dir = TempDir::new().unwrap();
        let pass = ShellTestRunner::new("echo ran {targets}", Some(Duration::from_secs(10)));
        let outcome = pass.run(dir.path(), &[dir.path().join("test_a.py")]);
        assert_eq!(
            outcome,
            TestOutcome::Passed {
                output: "ran test_a.py".into()
            }
        );

        let fail = ShellTestRunner::new("echo boom >&2; exit 1", None);
        match fail.run(dir.path(), &[]) {
            TestOutcome::Failed { output, exit } => {
                assert_eq!(output, "boom");
                assert_eq!(exit, "exited with code 1");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn shell_runner_timeout_is_distinct() {
        let dir = TempDir::new().unwrap();
        let runner = ShellTestRunner::new("sleep 60", Some(Duration::from_millis(150)));
        let outcome = runner.run(dir.path(), &[]);
        assert!(matches!(outcome, TestOutcome::TimedOut { .. }));
    }

    #[test]
    fn failure_output_survives_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let runner = ShellTestRunner::new(
            "printf 'FAILED test_charge: expected 3\\n\\377\\n'; exit 1",
            None,
        );
        match runner.run(dir.path(), &[]) {
            TestOutcome::Failed { output, exit } => {
                assert!(output.starts_with("FAILED test_charge: expected 3"), "{output:?}");
                assert_eq!(exit, "exited with code 1");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn empty_command_is_error() {
        let runner = ShellTestRunner::new("  ", None);
        assert!(matches!(
            runner.run(Path::new("/tmp"), &[]),
            TestOutcome::Error { .. }
        ));
    }

    #[test]
    fn outcome_json_tagged() {
        let json = serde_json::to_string(&TestOutcome::TimedOut { seconds: 5 }).unwrap();
        assert!(json.contains("\"result\":\"timed_out\""));
    }

    #[test]
    fn parse_shortstat_full() {
        let stat =
            DiffStat::parse_shortstat(" 3 files changed, 42 insertions(+), 7 deletions(-)\n");
        assert_eq!(
            stat,
            DiffStat {
                files_changed: 3,
                insertions: 42,
                deletions: 7
            }
        );
    }

    #[test]
    fn parse_shortstat_partial_and_empty() {
        let stat = DiffStat::parse_shortstat(" 1 file changed, 1 deletion(-)\n");
        assert_eq!(stat.files_changed, 1);
        assert_eq!(stat.insertions, 0);
        assert_eq!(stat.deletions, 1);
        assert_eq!(DiffStat::parse_shortstat(""), DiffStat::default());
    }

    fn git_in(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(["-c", "user.name=holes", "-c", "user.email=holes@example.com"])
            .args(["-c", "commit.gpgsign=false"])
            .args(args)
            .current_dir(dir)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .unwrap();
        assert!(status.success(), "git {args:?} failed");
    }

    #[test]
    fn git_reports_protected_path_changes() {
        if which::which("git").is_err() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        git_in(root, &["init", "-q"]);
        git_in(root, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        std::fs::create_dir_all(root.join(".beads")).unwrap();
        std::fs::write(root.join(".beads/issues.jsonl"), "{\"id\":1}\n").unwrap();
        std::fs::write(root.join("README.md"), "hello\n").unwrap();
        git_in(root, &["add", "."]);
        git_in(root, &["commit", "-q", "-m", "baseline"]);
        git_in(root, &["checkout", "-q", "-b", "refactor"]);

        let git = Git::new(root, Some(Duration::from_secs(30)));
        let beads = Path::new(".beads");
        assert_eq!(git.current_branch().unwrap(), "refactor");
        assert!(git.changed_paths("main", beads).unwrap().is_empty());

        // Changes outside the protected path do not count.
        std::fs::write(root.join("README.md"), "changed\n").unwrap();
        assert!(git.changed_paths("main", beads).unwrap().is_empty());

        std::fs::write(root.join(".beads/issues.jsonl"), "{\"id\":2}\n").unwrap();
        assert_eq!(
            git.changed_paths("main", beads).unwrap(),
            vec![".beads/issues.jsonl".to_string()]
        );

        std::fs::write(root.join(".beads/new.jsonl"), "{}\n").unwrap();
        assert_eq!(
            git.changed_paths("main", beads).unwrap(),
            vec![".beads/issues.jsonl".to_string(), ".beads/new.jsonl".to_string()]
        );

        assert_eq!(git.diff_stat("main").unwrap().files_changed, 2);
    }

    #[test]
    fn git_outside_repository_is_vcs_error() {
        let dir = TempDir::new().unwrap();
        let git = Git::new(dir.path(), Some(Duration::from_secs(10)));
        // Either git is missing or the directory is not a repository.
        assert!(matches!(git.current_branch(), Err(HolesError::Vcs(_))));
    }
}
