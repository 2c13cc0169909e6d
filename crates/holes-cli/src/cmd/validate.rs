use crate::cmd::{document_path, load_config, Outcome};
use crate::output::{print_json, FAIL, PASS};
use holes_core::hole::validate_hole_id;
use holes_core::resolution::{validate_resolution, ResolutionContext, ResolutionReport};
use holes_core::runner::{Git, ShellTestRunner};
use std::path::Path;

pub fn run(root: &Path, hole_id: &str, ir: Option<&Path>, json: bool) -> anyhow::Result<Outcome> {
    validate_hole_id(hole_id)?;
    let config = load_config(root)?;
    let document = document_path(root, &config, ir);

    let runner = ShellTestRunner::from_config(&config);
    let vcs = Git::new(root, config.vcs_timeout());
    let ctx = ResolutionContext {
        root,
        config: &config,
        document: &document,
        runner: &runner,
        vcs: &vcs,
    };
    let report = validate_resolution(&ctx, hole_id);

    if json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }
    Ok(Outcome::from_passed(report.passed))
}

fn print_report(report: &ResolutionReport) {
    println!("Resolution gate: {}", report.hole_id);
    for check in &report.checks {
        if check.detail.is_empty() {
            println!("  {} {}", check.status.marker(), check.name);
        } else {
            println!("  {} {}: {}", check.status.marker(), check.name, check.detail);
        }
    }
    println!();

    if report.passed {
        println!("{PASS} {} is ready to be marked resolved.", report.hole_id);
        println!("Next:");
        println!(
            "  1. holes mark {} resolved --resolution \"<summary>\"",
            report.hole_id
        );
        println!("  2. holes propagate {}", report.hole_id);
        println!("  3. commit the resolution and its tests");
        return;
    }

    println!(
        "{FAIL} {} of {} checks failed, {} error(s):",
        report.failed_checks().count(),
        report.checks.len(),
        report.errors.len()
    );
    for issue in &report.errors {
        println!("  {FAIL} {issue}");
        if let Some(output) = &issue.output {
            for line in output.lines() {
                println!("      {line}");
            }
        }
    }
}
