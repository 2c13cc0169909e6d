//! Explicit write-back of a hole's status. This is the only code path that
//! modifies the refactor document.

use crate::error::{HolesError, Result};
use crate::hole::Hole;
use crate::parser::{field_span, heading_level, parse, Document};
use crate::types::HoleStatus;
use std::path::Path;

/// Return `text` with the status (and optionally the resolution) of `id`
/// rewritten in place. Backward transitions are rejected.
pub fn set_status(
    text: &str,
    id: &str,
    status: HoleStatus,
    resolution: Option<&str>,
) -> Result<String> {
    let doc = parse(text);
    let hole = doc
        .get(id)
        .ok_or_else(|| HolesError::HoleNotFound(id.to_string()))?;
    if !hole.status.can_transition_to(status) {
        return Err(HolesError::InvalidTransition {
            id: id.to_string(),
            from: hole.status.to_string(),
            to: status.to_string(),
        });
    }

    let newline = if text.contains("\r\n") { "\r\n" } else { "\n" };
    let mut lines: Vec<String> = text.lines().map(String::from).collect();

    // The parser guarantees the status field follows the heading before the
    // next heading.
    let heading = hole.line - 1;
    let status_idx = (heading + 1..lines.len())
        .take_while(|i| heading_level(&lines[*i]).is_none())
        .find(|i| {
            field_span(&lines[*i])
                .map(|f| f.label == "status")
                .unwrap_or(false)
        })
        .ok_or_else(|| HolesError::HoleNotFound(id.to_string()))?;

    lines[status_idx] = replace_value(&lines[status_idx], status.as_str());

    if let Some(text) = resolution {
        let text = text.trim();
        let next = (status_idx + 1..lines.len()).find(|i| !lines[*i].trim().is_empty());
        let existing = next.filter(|i| {
            heading_level(&lines[*i]).is_none()
                && field_span(&lines[*i])
                    .map(|f| f.label == "resolution")
                    .unwrap_or(false)
        });
        match existing {
            Some(i) => lines[i] = replace_value(&lines[i], text),
            None => {
                let new_line = relabel(&lines[status_idx], "Resolution", text);
                lines.insert(status_idx + 1, new_line);
            }
        }
    }

    let mut out = lines.join(newline);
    if text.ends_with('\n') {
        out.push_str(newline);
    }
    Ok(out)
}

fn replace_value(line: &str, value: &str) -> String {
    match field_span(line) {
        Some(span) => format!("{}{}", &line[..span.value_range.start], value),
        None => line.to_string(),
    }
}

/// Copy the formatting of `line` with a different label and value.
fn relabel(line: &str, label: &str, value: &str) -> String {
    match field_span(line) {
        Some(span) => format!(
            "{}{}{}{}",
            &line[..span.label_range.start],
            label,
            &line[span.label_range.end..span.value_range.start],
            value
        ),
        None => format!("**{label}**: {value}"),
    }
}

/// Update the document on disk atomically and return the updated hole.
pub fn mark(path: &Path, id: &str, status: HoleStatus, resolution: Option<&str>) -> Result<Hole> {
    if !path.is_file() {
        return Err(HolesError::DocumentNotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path)?;
    let updated = set_status(&text, id, status, resolution)?;
    crate::io::atomic_write(path, updated.as_bytes())?;
    tracing::debug!(hole = id, %status, "hole status written");

    let doc: Document = parse(&updated);
    doc.get(id)
        .cloned()
        .ok_or_else(|| HolesError::HoleNotFound(id.to_string()))
}
