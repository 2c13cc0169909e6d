use crate::cmd::{document_path, load_config, Outcome};
use crate::output::{print_json, FAIL, PASS, WARN};
use holes_core::discovery::{self, DiscoveryInput};
use holes_core::paths;
use std::path::Path;

pub fn run(
    root: &Path,
    ir: Option<&Path>,
    tests: Option<&Path>,
    json: bool,
) -> anyhow::Result<Outcome> {
    let config = load_config(root)?;
    let document = document_path(root, &config, ir);
    let baseline_dir = match tests {
        Some(p) => paths::under_root(root, p),
        None => config.baseline_dir(root),
    };

    let report = discovery::check(&DiscoveryInput {
        document: &document,
        baseline_dir: &baseline_dir,
        test_prefix: &config.test_prefix,
        test_suffix: &config.test_suffix,
    });

    if json {
        print_json(&report)?;
        return Ok(Outcome::from_passed(report.passed));
    }

    println!("Discovery gate: {}", document.display());
    for issue in &report.issues {
        println!("  {FAIL} {issue}");
    }
    for warning in &report.warnings {
        println!("  {WARN} {warning}");
    }
    if report.passed {
        println!("{PASS} Discovery complete. Start with: holes next-hole");
    } else {
        println!(
            "{FAIL} Discovery incomplete: {} issue(s), {} warning(s)",
            report.issues.len(),
            report.warnings.len()
        );
    }
    Ok(Outcome::from_passed(report.passed))
}
