//! Parser for the refactor document.
//!
//! The document is markdown. A hole is a level-3 heading whose first token is
//! a hole id, followed immediately (blank lines allowed) by three labeled
//! fields in order:
//!
//! ```text
//! ### R1_error_strategy
//! **Question**: Which error type replaces the string errors?
//! **Dependencies**: H1_error_sites, H2_callers
//! **Status**: pending
//! **Resolution**: optional free text
//! ```
//!
//! Blocks that do not have this shape produce a located [`ParseWarning`]
//! instead of a hole. The parser also records the level-2 sections the gates
//! inspect (`## Constraints`, the dependency graph section).

use crate::error::{HolesError, Result};
use crate::hole::{is_valid_hole_id, parse_dependency_list, Hole};
use crate::types::{HoleStatus, HoleType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::path::Path;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hole_id: Option<String>,
    pub message: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.hole_id {
            Some(id) => write!(f, "line {}: {id}: {}", self.line, self.message),
            None => write!(f, "line {}: {}", self.line, self.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintCategory {
    MustPreserve,
    MustImprove,
    MustMaintain,
}

impl ConstraintCategory {
    pub fn all() -> &'static [ConstraintCategory] {
        &[
            ConstraintCategory::MustPreserve,
            ConstraintCategory::MustImprove,
            ConstraintCategory::MustMaintain,
        ]
    }

    pub fn label(self) -> &'static str {
        match self {
            ConstraintCategory::MustPreserve => "Must Preserve",
            ConstraintCategory::MustImprove => "Must Improve",
            ConstraintCategory::MustMaintain => "Must Maintain",
        }
    }

    fn needle(self) -> &'static str {
        match self {
            ConstraintCategory::MustPreserve => "must preserve",
            ConstraintCategory::MustImprove => "must improve",
            ConstraintCategory::MustMaintain => "must maintain",
        }
    }
}

impl fmt::Display for ConstraintCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    pub line: usize,
    pub categories: Vec<ConstraintCategory>,
}

/// Immutable snapshot of one parse of the refactor document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub holes: BTreeMap<String, Hole>,
    pub sections: Vec<Section>,
    pub constraints: Option<Constraints>,
    pub warnings: Vec<ParseWarning>,
}

impl Document {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(HolesError::DocumentNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Ok(parse(&text))
    }

    pub fn get(&self, id: &str) -> Option<&Hole> {
        self.holes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.holes.contains_key(id)
    }

    /// Holes in lexicographic id order.
    pub fn holes(&self) -> impl Iterator<Item = &Hole> {
        self.holes.values()
    }

    pub fn len(&self) -> usize {
        self.holes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holes.is_empty()
    }

    pub fn holes_of_type(&self, hole_type: HoleType) -> impl Iterator<Item = &Hole> {
        self.holes().filter(move |h| h.hole_type == hole_type)
    }

    pub fn has_graph_section(&self) -> bool {
        self.sections
            .iter()
            .any(|s| s.title.to_lowercase().contains("graph"))
    }

    pub fn missing_constraint_categories(&self) -> Vec<ConstraintCategory> {
        match &self.constraints {
            None => ConstraintCategory::all().to_vec(),
            Some(c) => ConstraintCategory::all()
                .iter()
                .copied()
                .filter(|cat| !c.categories.contains(cat))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Line grammar
// ---------------------------------------------------------------------------

static BOLD_FIELD_RE: OnceLock<Regex> = OnceLock::new();
static PLAIN_FIELD_RE: OnceLock<Regex> = OnceLock::new();
static NEAR_ID_RE: OnceLock<Regex> = OnceLock::new();

fn bold_field_re() -> &'static Regex {
    BOLD_FIELD_RE.get_or_init(|| {
        Regex::new(r"^\s*(?:[-*]\s+)?\*\*(?P<label>[^*:]+?)(?::\*\*|\*\*\s*:)\s*(?P<value>.*)$")
            .unwrap()
    })
}

fn plain_field_re() -> &'static Regex {
    PLAIN_FIELD_RE.get_or_init(|| {
        Regex::new(r"^\s*(?:[-*]\s+)?(?P<label>[A-Za-z][A-Za-z _-]*?)\s*:\s*(?P<value>.*)$")
            .unwrap()
    })
}

fn near_id_re() -> &'static Regex {
    NEAR_ID_RE.get_or_init(|| Regex::new(r"^[A-Za-z]+[0-9]+").unwrap())
}

/// Byte ranges of the label and value within a field line.
pub(crate) struct FieldSpan {
    pub label: String,
    pub label_range: Range<usize>,
    pub value_range: Range<usize>,
}

pub(crate) fn field_span(line: &str) -> Option<FieldSpan> {
    let caps = bold_field_re()
        .captures(line)
        .or_else(|| plain_field_re().captures(line))?;
    let label = caps.name("label")?;
    let value = caps.name("value")?;
    Some(FieldSpan {
        label: label.as_str().trim().to_lowercase(),
        label_range: label.range(),
        value_range: value.range(),
    })
}

/// `(lowercased label, value)` for a `**Label**: value` or `Label: value` line.
fn parse_field(line: &str) -> Option<(String, String)> {
    let span = field_span(line)?;
    let value = line[span.value_range].trim().to_string();
    Some((span.label, value))
}

pub(crate) fn heading_level(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &trimmed[hashes..];
    if !rest.is_empty() && !rest.starts_with(' ') {
        return None;
    }
    Some((hashes, rest.trim()))
}

fn heading_token(title: &str) -> &str {
    title
        .split_whitespace()
        .next()
        .unwrap_or("")
        .trim_end_matches(':')
        .trim_matches('`')
}

fn clean_value(value: &str) -> &str {
    value.trim().trim_matches('*').trim_matches('`').trim()
}

fn normalize_label_text(text: &str) -> String {
    text.to_lowercase().replace(['-', '_'], " ")
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

const FIELD_ORDER: [&str; 3] = ["question", "dependencies", "status"];

pub fn parse(text: &str) -> Document {
    let lines: Vec<&str> = text.lines().collect();
    let mut doc = Document::default();
    let mut in_fence = false;
    let mut constraints_body: Option<(usize, String)> = None;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        let line_no = i + 1;

        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            if let Some((_, body)) = constraints_body.as_mut() {
                body.push_str(line);
                body.push('\n');
            }
            i += 1;
            continue;
        }
        if in_fence {
            if let Some((_, body)) = constraints_body.as_mut() {
                body.push_str(line);
                body.push('\n');
            }
            i += 1;
            continue;
        }

        match heading_level(line) {
            Some((level, title)) if level <= 2 => {
                finish_constraints(&mut doc, constraints_body.take());
                if level == 2 {
                    doc.sections.push(Section {
                        title: title.to_string(),
                        line: line_no,
                    });
                    if title.to_lowercase().starts_with("constraints") {
                        constraints_body = Some((line_no, String::new()));
                    }
                }
                i += 1;
            }
            Some((3, title)) => {
                let token = heading_token(title);
                if is_valid_hole_id(token) {
                    i = parse_hole_block(&lines, i, token, &mut doc);
                } else {
                    if near_id_re().is_match(token) {
                        doc.warnings.push(ParseWarning {
                            line: line_no,
                            hole_id: None,
                            message: format!(
                                "heading '{token}' looks like a hole id but does not match <PREFIX><number>[_suffix]"
                            ),
                        });
                    }
                    if let Some((_, body)) = constraints_body.as_mut() {
                        body.push_str(line);
                        body.push('\n');
                    }
                    i += 1;
                }
            }
            _ => {
                if let Some((_, body)) = constraints_body.as_mut() {
                    body.push_str(line);
                    body.push('\n');
                }
                i += 1;
            }
        }
    }
    finish_constraints(&mut doc, constraints_body);
    doc
}

fn finish_constraints(doc: &mut Document, body: Option<(usize, String)>) {
    let Some((line, body)) = body else {
        return;
    };
    let normalized = normalize_label_text(&body);
    let categories = ConstraintCategory::all()
        .iter()
        .copied()
        .filter(|c| normalized.contains(c.needle()))
        .collect();
    // A second `## Constraints` section extends the first.
    match doc.constraints.as_mut() {
        Some(existing) => {
            for c in categories {
                if !existing.categories.contains(&c) {
                    existing.categories.push(c);
                }
            }
        }
        None => doc.constraints = Some(Constraints { line, categories }),
    }
}

/// Parse one hole block starting at the heading on `start`. Returns the index
/// of the first line not consumed.
fn parse_hole_block(lines: &[&str], start: usize, id: &str, doc: &mut Document) -> usize {
    let heading_line = start + 1;
    // (1-based line, value) per field
    let mut values: Vec<(usize, String)> = Vec::with_capacity(3);
    let mut j = start + 1;

    let warn = |doc: &mut Document, line: usize, message: String| {
        doc.warnings.push(ParseWarning {
            line,
            hole_id: Some(id.to_string()),
            message,
        });
    };

    for expected in FIELD_ORDER {
        while j < lines.len() && lines[j].trim().is_empty() {
            j += 1;
        }
        if j >= lines.len() {
            warn(
                doc,
                heading_line,
                format!("block ends before the {expected} field; hole skipped"),
            );
            return j;
        }
        if heading_level(lines[j]).is_some() {
            warn(
                doc,
                j + 1,
                format!("expected {expected} field, found a heading; hole skipped"),
            );
            return j;
        }
        match parse_field(lines[j]) {
            Some((label, value)) if label == expected => {
                values.push((j + 1, value));
                j += 1;
            }
            Some((label, _)) => {
                warn(
                    doc,
                    j + 1,
                    format!("expected {expected} field, found '{label}'; hole skipped"),
                );
                return j + 1;
            }
            None => {
                warn(
                    doc,
                    j + 1,
                    format!(
                        "expected {expected} field, found '{}'; hole skipped",
                        lines[j].trim()
                    ),
                );
                return j + 1;
            }
        }
    }

    let (status_line, raw_status) = &values[2];
    let status = match clean_value(raw_status).parse::<HoleStatus>() {
        Ok(s) => s,
        Err(_) => {
            warn(
                doc,
                *status_line,
                format!(
                    "unknown status '{}': expected pending, in_progress, resolved or done; hole skipped",
                    clean_value(raw_status)
                ),
            );
            return j;
        }
    };

    // Optional resolution field directly after the status.
    let mut resolution = None;
    let mut k = j;
    while k < lines.len() && lines[k].trim().is_empty() {
        k += 1;
    }
    if k < lines.len() && heading_level(lines[k]).is_none() {
        if let Some((label, value)) = parse_field(lines[k]) {
            if label == "resolution" {
                if !value.is_empty() {
                    resolution = Some(value);
                }
                j = k + 1;
            }
        }
    }

    let (deps_line, raw_deps) = &values[1];
    let dependencies = parse_dependency_list(raw_deps);
    for dep in &dependencies {
        if !is_valid_hole_id(dep) {
            warn(
                doc,
                *deps_line,
                format!("dependency '{dep}' is not a valid hole id"),
            );
        }
    }

    let hole = Hole {
        id: id.to_string(),
        hole_type: HoleType::from_id(id),
        question: values[0].1.clone(),
        dependencies,
        status,
        resolution,
        line: heading_line,
    };

    if let Some(previous) = doc.holes.insert(id.to_string(), hole) {
        warn(
            doc,
            heading_line,
            format!(
                "duplicate hole id overrides the definition at line {}",
                previous.line
            ),
        );
    }
    j
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
