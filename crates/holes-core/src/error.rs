use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HolesError {
    #[error("refactor document not found: {}", .0.display())]
    DocumentNotFound(PathBuf),

    #[error("hole not found: {0}")]
    HoleNotFound(String),

    #[error("invalid hole id '{0}': expected <PREFIX><number>[_suffix], e.g. R1_error_strategy")]
    InvalidHoleId(String),

    #[error("invalid status '{0}': expected pending, in_progress, resolved or done")]
    InvalidStatus(String),

    #[error("invalid transition for {id} from {from} to {to}: statuses only move forward")]
    InvalidTransition { id: String, from: String, to: String },

    #[error("version control: {0}")]
    Vcs(String),

    #[error("{command} timed out after {seconds}s")]
    TimedOut { command: String, seconds: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HolesError>;
