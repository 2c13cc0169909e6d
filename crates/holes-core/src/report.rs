use crate::graph::{self, Progress};
use crate::parser::Document;
use crate::runner::DiffStat;
use chrono::{DateTime, Utc};
use std::fmt::Write;

/// Render the final refactor report as markdown with fixed sections:
/// Summary, Hole Resolution, Metrics, Recommendation.
pub fn synthesize(doc: &Document, diff: Option<&DiffStat>, generated_at: DateTime<Utc>) -> String {
    let progress = graph::progress(doc);
    let diagnostics = graph::validate(doc);
    let mut out = String::new();

    let _ = writeln!(out, "# Refactor Report");
    let _ = writeln!(out);
    let _ = writeln!(out, "Generated {}", generated_at.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(out);

    // Summary
    let _ = writeln!(out, "## Summary");
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", summary_line(&progress));
    let _ = writeln!(out);

    // Hole Resolution
    let _ = writeln!(out, "## Hole Resolution");
    let _ = writeln!(out);
    if doc.is_empty() {
        let _ = writeln!(out, "No holes recorded.");
    } else {
        let _ = writeln!(out, "| Hole | Type | Status | Resolution |");
        let _ = writeln!(out, "|------|------|--------|------------|");
        for hole in doc.holes() {
            let resolution = hole
                .resolution
                .as_deref()
                .map(|r| r.replace('|', "\\|"))
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} |",
                hole.id, hole.hole_type, hole.status, resolution
            );
        }
    }
    let _ = writeln!(out);

    // Metrics
    let _ = writeln!(out, "## Metrics");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "- Holes resolved: {}/{} ({}%)",
        progress.resolved,
        progress.total,
        progress.percent()
    );
    let _ = writeln!(out, "- In progress: {}", progress.in_progress);
    let _ = writeln!(out, "- Pending: {}", progress.pending);
    match diff {
        Some(stat) => {
            let _ = writeln!(out, "- Files changed: {}", stat.files_changed);
            let _ = writeln!(out, "- Lines added: {}", stat.insertions);
            let _ = writeln!(out, "- Lines removed: {}", stat.deletions);
        }
        None => {
            let _ = writeln!(out, "- Diff statistics unavailable");
        }
    }
    let _ = writeln!(out);

    // Recommendation
    let _ = writeln!(out, "## Recommendation");
    let _ = writeln!(out);
    if !diagnostics.is_clean() {
        let _ = writeln!(out, "**Fix the hole graph before merging.**");
        for d in &diagnostics.dangling {
            let _ = writeln!(out, "- Dangling dependency: {d}");
        }
        for c in &diagnostics.cycles {
            let _ = writeln!(out, "- Dependency cycle: {c}");
        }
    } else if progress.is_complete() {
        let _ = writeln!(out, "**Ready to merge.** Every hole is resolved.");
    } else {
        let remaining = progress.total - progress.resolved;
        let _ = writeln!(
            out,
            "**Not ready to merge.** {remaining} hole(s) remain unresolved."
        );
        if let Some(next) = graph::suggest_next(doc) {
            let _ = writeln!(out, "- Next: {} ({})", next.id, next.question);
        }
        for hole in graph::blocked(doc) {
            let _ = writeln!(
                out,
                "- Blocked: {} on {}",
                hole.id,
                graph::blockers(doc, hole).join(", ")
            );
        }
    }

    out
}

fn summary_line(progress: &Progress) -> String {
    if progress.total == 0 {
        return "The refactor document records no holes.".to_string();
    }
    if progress.is_complete() {
        return format!("All {} holes are resolved.", progress.total);
    }
    format!(
        "{} of {} holes resolved; {} in progress, {} pending.",
        progress.resolved, progress.total, progress.in_progress, progress.pending
    )
}
