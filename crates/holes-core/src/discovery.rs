//! Structural completeness check run once before resolution work starts.

use crate::error::HolesError;
use crate::graph;
use crate::parser::Document;
use crate::paths;
use crate::types::HoleType;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const GATE_NAME: &str = "discovery";

/// `{gate, passed, issues[], warnings[]}`. Any issue fails the gate; warnings
/// are informational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryReport {
    pub gate: String,
    pub passed: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

impl DiscoveryReport {
    fn from_findings(issues: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            gate: GATE_NAME.to_string(),
            passed: issues.is_empty(),
            issues,
            warnings,
        }
    }
}

pub struct DiscoveryInput<'a> {
    pub document: &'a Path,
    pub baseline_dir: &'a Path,
    pub test_prefix: &'a str,
    pub test_suffix: &'a str,
}

/// Run every discovery check and aggregate the findings. Never stops early.
pub fn check(input: &DiscoveryInput) -> DiscoveryReport {
    let mut issues = Vec::new();
    let mut warnings = Vec::new();

    match Document::load(input.document) {
        Ok(doc) => check_document(&doc, &mut issues, &mut warnings),
        Err(HolesError::DocumentNotFound(path)) => {
            issues.push(format!("refactor document not found: {}", path.display()));
        }
        Err(e) => issues.push(format!(
            "refactor document {} could not be read: {e}",
            input.document.display()
        )),
    }

    check_baseline_tests(input, &mut issues);

    tracing::debug!(
        issues = issues.len(),
        warnings = warnings.len(),
        "discovery gate evaluated"
    );
    DiscoveryReport::from_findings(issues, warnings)
}

fn check_document(doc: &Document, issues: &mut Vec<String>, warnings: &mut Vec<String>) {
    // Hole categories
    if doc.holes_of_type(HoleType::Refactor).next().is_none() {
        issues.push("no refactor holes (R<n>) defined".to_string());
    }
    let current_state: Vec<_> = doc.holes_of_type(HoleType::CurrentState).collect();
    if current_state.is_empty() {
        warnings.push(
            "no current-state holes (H<n>) defined; characterize the existing system first"
                .to_string(),
        );
    }

    // Sections
    if !doc.has_graph_section() {
        issues.push(
            "dependency graph section missing (expected a '## ... Graph' heading)".to_string(),
        );
    }
    if doc.constraints.is_none() {
        issues.push("'## Constraints' section missing".to_string());
    } else {
        for category in doc.missing_constraint_categories() {
            issues.push(format!(
                "constraints section does not name '{}'",
                category.label()
            ));
        }
    }

    // Graph consistency
    let diagnostics = graph::validate(doc);
    for dangling in &diagnostics.dangling {
        issues.push(format!("dangling dependency: {dangling}"));
    }
    for cycle in &diagnostics.cycles {
        issues.push(format!("dependency cycle: {cycle}"));
    }

    // Soft checks
    let unresolved: Vec<&str> = current_state
        .iter()
        .filter(|h| !h.is_resolved())
        .map(|h| h.id.as_str())
        .collect();
    if !unresolved.is_empty() {
        warnings.push(format!(
            "current-state holes not yet resolved: {}",
            unresolved.join(", ")
        ));
    }
    for w in &doc.warnings {
        warnings.push(format!("malformed record: {w}"));
    }
}

fn check_baseline_tests(input: &DiscoveryInput, issues: &mut Vec<String>) {
    let dir = input.baseline_dir;
    let (prefix, suffix) = (input.test_prefix, input.test_suffix);
    if !dir.is_dir() {
        issues.push(format!(
            "characterization test directory not found: {}",
            dir.display()
        ));
        return;
    }
    match paths::list_test_modules(dir, prefix, suffix) {
        Ok(modules) if modules.is_empty() => issues.push(format!(
            "no characterization tests ({prefix}*{suffix}) in {}",
            dir.display()
        )),
        Ok(_) => {}
        Err(e) => issues.push(format!("cannot read {}: {e}", dir.display())),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
