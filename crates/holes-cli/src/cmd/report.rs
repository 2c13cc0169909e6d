use crate::cmd::{document_path, load_config, Outcome};
use crate::output::{print_json, PASS, WARN};
use anyhow::Context;
use chrono::Utc;
use holes_core::io::atomic_write;
use holes_core::parser::Document;
use holes_core::paths;
use holes_core::report::synthesize;
use holes_core::runner::{Git, VersionControl};
use serde_json::json;
use std::path::{Path, PathBuf};

/// `output`: `None` prints to stdout, `Some(None)` writes the configured
/// report file, `Some(Some(path))` writes `path`.
pub fn run(
    root: &Path,
    ir: Option<&Path>,
    output: Option<Option<PathBuf>>,
    json: bool,
) -> anyhow::Result<Outcome> {
    let config = load_config(root)?;
    let path = document_path(root, &config, ir);
    let doc = Document::load(&path)
        .with_context(|| format!("failed to load refactor document {}", path.display()))?;

    let git = Git::new(root, config.vcs_timeout());
    let diff = match git.diff_stat(&config.protected_branch) {
        Ok(stat) => Some(stat),
        Err(e) => {
            tracing::warn!("diff statistics unavailable: {e}");
            None
        }
    };
    let report = synthesize(&doc, diff.as_ref(), Utc::now());

    let target = output.map(|o| {
        let p = o.unwrap_or_else(|| config.report_file.clone());
        paths::under_root(root, &p)
    });

    match target {
        Some(target) => {
            atomic_write(&target, report.as_bytes())
                .with_context(|| format!("failed to write {}", target.display()))?;
            if json {
                print_json(&json!({ "written": target, "holes": doc.len() }))?;
            } else {
                println!("{PASS} Report written to {}", target.display());
            }
        }
        None if json => print_json(&json!({ "report": report }))?,
        None => print!("{report}"),
    }

    if diff.is_none() && !json {
        eprintln!("{WARN} diff statistics unavailable; see the Metrics section");
    }
    Ok(Outcome::Pass)
}
