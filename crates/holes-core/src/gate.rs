use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// IssueKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Document missing, a required section absent, or an unknown hole.
    Structural,
    MalformedRecord,
    DanglingDependency,
    DependencyCycle,
    UnresolvedDependency,
    MissingTests,
    TestFailure,
    TimedOut,
    ProtectedPathViolation,
    VcsError,
}

impl IssueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::Structural => "structural",
            IssueKind::MalformedRecord => "malformed_record",
            IssueKind::DanglingDependency => "dangling_dependency",
            IssueKind::DependencyCycle => "dependency_cycle",
            IssueKind::UnresolvedDependency => "unresolved_dependency",
            IssueKind::MissingTests => "missing_tests",
            IssueKind::TestFailure => "test_failure",
            IssueKind::TimedOut => "timed_out",
            IssueKind::ProtectedPathViolation => "protected_path_violation",
            IssueKind::VcsError => "vcs_error",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// GateIssue
// ---------------------------------------------------------------------------

/// One finding from a gate. Gates collect every issue rather than stopping
/// at the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateIssue {
    pub kind: IssueKind,
    pub message: String,
    /// Verbatim test-runner output, when the issue came from a test run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl GateIssue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            output: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        let output = output.into();
        if !output.is_empty() {
            self.output = Some(output);
        }
        self
    }
}

impl fmt::Display for GateIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

// ---------------------------------------------------------------------------
// CheckResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Passed,
    Failed,
    Skipped,
}

impl CheckStatus {
    /// Console marker.
    pub fn marker(self) -> &'static str {
        match self {
            CheckStatus::Passed => "✓",
            CheckStatus::Failed => "✗",
            CheckStatus::Skipped => "-",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub detail: String,
    pub duration_ms: u64,
}

impl CheckResult {
    pub fn passed(name: &str, detail: impl Into<String>) -> Self {
        Self::with_status(name, CheckStatus::Passed, detail)
    }

    pub fn failed(name: &str, detail: impl Into<String>) -> Self {
        Self::with_status(name, CheckStatus::Failed, detail)
    }

    pub fn skipped(name: &str, detail: impl Into<String>) -> Self {
        Self::with_status(name, CheckStatus::Skipped, detail)
    }

    fn with_status(name: &str, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            detail: detail.into(),
            duration_ms: 0,
        }
    }

    pub fn timed(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
