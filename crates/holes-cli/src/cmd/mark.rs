use crate::cmd::{document_path, load_config, Outcome};
use crate::output::{print_json, PASS};
use anyhow::Context;
use holes_core::mark::mark;
use holes_core::types::HoleStatus;
use std::path::Path;

pub fn run(
    root: &Path,
    hole_id: &str,
    status: &str,
    resolution: Option<&str>,
    ir: Option<&Path>,
    json: bool,
) -> anyhow::Result<Outcome> {
    let status: HoleStatus = status.parse()?;
    let config = load_config(root)?;
    let path = document_path(root, &config, ir);

    let hole = mark(&path, hole_id, status, resolution)
        .with_context(|| format!("failed to mark {hole_id} as {status}"))?;

    if json {
        print_json(&hole)?;
    } else {
        println!("{PASS} {} is now {}", hole.id, hole.status);
        if hole.is_resolved() {
            println!("Next: holes propagate {}", hole.id);
        }
    }
    Ok(Outcome::Pass)
}
