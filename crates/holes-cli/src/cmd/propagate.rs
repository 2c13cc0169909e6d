use crate::cmd::{document_path, load_advisory_document, load_config, Outcome};
use crate::output::{print_json, PASS, WARN};
use holes_core::propagate::{propagate, PropagationPlan};
use holes_core::types::HoleStatus;
use std::path::Path;

pub fn run(root: &Path, hole_id: &str, ir: Option<&Path>, json: bool) -> anyhow::Result<Outcome> {
    let config = load_config(root)?;
    let path = document_path(root, &config, ir);
    let Some(doc) = load_advisory_document(&path, json)? else {
        return Ok(Outcome::Pass);
    };

    let plan = propagate(&doc, hole_id);
    if json {
        print_json(&plan)?;
    } else {
        print_plan(&plan);
    }
    Ok(Outcome::Pass)
}

fn print_plan(plan: &PropagationPlan) {
    let id = &plan.resolved;
    match plan.status {
        None => println!("{WARN} {id} is not defined in the refactor document"),
        Some(status) if status != HoleStatus::Resolved => {
            println!("{WARN} {id} is {status}, not yet resolved; propagation is provisional")
        }
        Some(_) => {}
    }

    if plan.is_leaf() {
        println!("{PASS} {id} is a leaf: no holes depend on it. Nothing to propagate.");
        return;
    }

    println!("Dependents of {id} ({}):", plan.dependents.len());
    for d in &plan.dependents {
        if d.still_blocked_by.is_empty() {
            println!("  {:<16} [{}] {}", d.id, d.status, d.question);
        } else {
            println!(
                "  {:<16} [{}] {} (still waiting on {})",
                d.id,
                d.status,
                d.question,
                d.still_blocked_by.join(", ")
            );
        }
    }

    println!();
    println!("Carry these constraints forward into each dependent:");
    for g in &plan.guidance {
        println!("  {}", g.title);
        println!("    {}", g.text);
    }
}
