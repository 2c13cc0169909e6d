pub mod discovery;
pub mod mark;
pub mod next;
pub mod propagate;
pub mod report;
pub mod validate;

use crate::output::{print_json, FAIL};
use anyhow::Context;
use holes_core::config::{Config, WarnLevel};
use holes_core::error::HolesError;
use holes_core::parser::Document;
use holes_core::paths;
use std::path::{Path, PathBuf};

/// How a command that completed without an error should exit. Gate commands
/// report failures as data and exit 1 without an `error:` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Fail,
}

impl Outcome {
    pub fn from_passed(passed: bool) -> Self {
        if passed {
            Outcome::Pass
        } else {
            Outcome::Fail
        }
    }
}

/// Load the project config and log anything it flags.
pub fn load_config(root: &Path) -> anyhow::Result<Config> {
    let config = Config::load(root).context("failed to load .holes/config.yaml")?;
    for w in config.validate() {
        match w.level {
            WarnLevel::Warning => tracing::warn!("config: {}", w.message),
            WarnLevel::Error => tracing::error!("config: {}", w.message),
        }
    }
    Ok(config)
}

/// `--ir` when given, otherwise the configured document. Relative paths
/// resolve under the root.
pub fn document_path(root: &Path, config: &Config, ir: Option<&Path>) -> PathBuf {
    match ir {
        Some(p) => paths::under_root(root, p),
        None => config.document_path(root),
    }
}

/// Load the refactor document for an advisory command. A missing document is
/// reported on stdout and yields `None`; the command still exits 0.
pub fn load_advisory_document(path: &Path, json: bool) -> anyhow::Result<Option<Document>> {
    match Document::load(path) {
        Ok(doc) => Ok(Some(doc)),
        Err(HolesError::DocumentNotFound(missing)) => {
            let message = format!("refactor document not found: {}", missing.display());
            if json {
                print_json(&serde_json::json!({ "error": message }))?;
            } else {
                println!("{FAIL} {message}");
            }
            Ok(None)
        }
        Err(e) => Err(e).with_context(|| {
            format!("failed to load refactor document {}", path.display())
        }),
    }
}
