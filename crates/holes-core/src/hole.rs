use crate::error::{HolesError, Result};
use crate::types::{HoleStatus, HoleType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A tracked open decision inside a refactor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hole {
    pub id: String,
    #[serde(rename = "type")]
    pub hole_type: HoleType,
    pub question: String,
    pub dependencies: Vec<String>,
    pub status: HoleStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    /// 1-based line of the heading that introduced the hole.
    pub line: usize,
}

impl Hole {
    pub fn new(id: impl Into<String>, question: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            hole_type: HoleType::from_id(&id),
            id,
            question: question.into(),
            dependencies: Vec::new(),
            status: HoleStatus::Pending,
            resolution: None,
            line: 0,
        }
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_status(mut self, status: HoleStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_resolved(&self) -> bool {
        self.status.is_resolved()
    }

    pub fn depends_on(&self, id: &str) -> bool {
        self.dependencies.iter().any(|d| d == id)
    }
}

// ---------------------------------------------------------------------------
// Id grammar
// ---------------------------------------------------------------------------

static HOLE_ID_RE: OnceLock<Regex> = OnceLock::new();

/// `<PREFIX><digits>[_<suffix>]`, e.g. `H0`, `R3_error_strategy`.
pub const HOLE_ID_PATTERN: &str = r"[A-Z]+[0-9]+(?:_[A-Za-z0-9_]+)?";

fn hole_id_re() -> &'static Regex {
    HOLE_ID_RE.get_or_init(|| Regex::new(&format!("^{HOLE_ID_PATTERN}$")).unwrap())
}

pub fn is_valid_hole_id(id: &str) -> bool {
    hole_id_re().is_match(id)
}

pub fn validate_hole_id(id: &str) -> Result<()> {
    if !is_valid_hole_id(id) {
        return Err(HolesError::InvalidHoleId(id.to_string()));
    }
    Ok(())
}

/// Split a dependency field value into ids. `None`, `-` and empty mean no
/// dependencies.
pub fn parse_dependency_list(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") || trimmed == "-" {
        return Vec::new();
    }
    trimmed
        .split(',')
        .map(|s| s.trim().trim_matches('`').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
