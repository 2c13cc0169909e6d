use crate::cmd::{document_path, load_advisory_document, load_config, Outcome};
use crate::output::{print_json, print_table, FAIL, PASS, WARN};
use holes_core::graph::{self, GraphDiagnostics, Progress};
use holes_core::hole::Hole;
use holes_core::parser::ParseWarning;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct BlockedHole<'a> {
    #[serde(flatten)]
    hole: &'a Hole,
    blocked_by: Vec<&'a str>,
    in_cycle: bool,
}

#[derive(Serialize)]
struct Frontier<'a> {
    progress: Progress,
    next: Option<&'a str>,
    resolvable: Vec<&'a Hole>,
    blocked: Vec<BlockedHole<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved: Option<Vec<&'a Hole>>,
    diagnostics: GraphDiagnostics,
    warnings: &'a [ParseWarning],
}

pub fn run(root: &Path, ir: Option<&Path>, show_all: bool, json: bool) -> anyhow::Result<Outcome> {
    let config = load_config(root)?;
    let path = document_path(root, &config, ir);
    let Some(doc) = load_advisory_document(&path, json)? else {
        return Ok(Outcome::Pass);
    };

    let diagnostics = graph::validate(&doc);
    let frontier = Frontier {
        progress: graph::progress(&doc),
        next: graph::suggest_next(&doc).map(|h| h.id.as_str()),
        blocked: graph::blocked(&doc)
            .into_iter()
            .map(|hole| BlockedHole {
                hole,
                blocked_by: graph::blockers(&doc, hole),
                in_cycle: diagnostics.in_cycle(&hole.id),
            })
            .collect(),
        resolvable: graph::resolvable(&doc),
        resolved: show_all.then(|| doc.holes().filter(|h| h.is_resolved()).collect()),
        diagnostics,
        warnings: &doc.warnings,
    };

    if json {
        print_json(&frontier)?;
    } else {
        print_frontier(&frontier);
    }
    Ok(Outcome::Pass)
}

fn print_frontier(f: &Frontier) {
    println!("Progress: {}", f.progress);

    for d in &f.diagnostics.dangling {
        println!("{FAIL} dangling dependency: {d}");
    }
    for c in &f.diagnostics.cycles {
        println!("{FAIL} dependency cycle: {c}");
    }
    for w in f.warnings {
        println!("{WARN} malformed record: {w}");
    }

    println!();
    if f.resolvable.is_empty() {
        if f.progress.is_complete() {
            println!("{PASS} All holes resolved. Run: holes generate-report");
        } else {
            println!("No hole is resolvable; every remaining hole is blocked.");
        }
    } else {
        println!("Resolvable ({}):", f.resolvable.len());
        for hole in &f.resolvable {
            println!("  {:<16} [{}] {}", hole.id, hole.status, hole.question);
        }
    }

    if !f.blocked.is_empty() {
        println!();
        println!("Blocked ({}):", f.blocked.len());
        for b in &f.blocked {
            let cycle = if b.in_cycle { " (dependency cycle)" } else { "" };
            println!("  {:<16} waiting on {}{cycle}", b.hole.id, b.blocked_by.join(", "));
        }
    }

    if let Some(resolved) = &f.resolved {
        println!();
        println!("Resolved ({}):", resolved.len());
        if !resolved.is_empty() {
            let rows = resolved
                .iter()
                .map(|h| {
                    vec![
                        h.id.clone(),
                        h.hole_type.to_string(),
                        h.resolution.clone().unwrap_or_else(|| "-".to_string()),
                    ]
                })
                .collect();
            print_table(&["ID", "TYPE", "RESOLUTION"], rows);
        }
    }

    if let Some(next) = f.next {
        println!();
        println!("Next: {next}");
        println!("  When done: holes validate-resolution {next}");
    }
}
