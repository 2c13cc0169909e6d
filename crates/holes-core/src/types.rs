use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// HoleStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoleStatus {
    Pending,
    InProgress,
    Resolved,
}

impl HoleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HoleStatus::Pending => "pending",
            HoleStatus::InProgress => "in_progress",
            HoleStatus::Resolved => "resolved",
        }
    }

    pub fn is_resolved(self) -> bool {
        self == HoleStatus::Resolved
    }

    /// Statuses only move forward: pending → in_progress → resolved.
    /// Re-asserting the current status is allowed.
    pub fn can_transition_to(self, next: HoleStatus) -> bool {
        next >= self
    }
}

impl fmt::Display for HoleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HoleStatus {
    type Err = crate::error::HolesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(HoleStatus::Pending),
            "in_progress" | "in-progress" | "in progress" => Ok(HoleStatus::InProgress),
            "resolved" | "done" => Ok(HoleStatus::Resolved),
            _ => Err(crate::error::HolesError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// HoleType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoleType {
    CurrentState,
    Refactor,
    Migration,
    Unknown,
}

impl HoleType {
    /// Derive the category from the alphabetic prefix of a hole id.
    pub fn from_id(id: &str) -> HoleType {
        let prefix: String = id.chars().take_while(|c| c.is_ascii_uppercase()).collect();
        match prefix.as_str() {
            "H" => HoleType::CurrentState,
            "R" => HoleType::Refactor,
            "M" => HoleType::Migration,
            _ => HoleType::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HoleType::CurrentState => "current_state",
            HoleType::Refactor => "refactor",
            HoleType::Migration => "migration",
            HoleType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HoleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
