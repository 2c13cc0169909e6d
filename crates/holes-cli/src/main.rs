mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "holes",
    about = "Typed-holes refactor workflow: gate, sequence and report on a hole graph",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .holes/ or .git/)
    #[arg(long, global = true, env = "HOLES_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the refactor document and baseline tests are complete
    DiscoveryCheck {
        /// Refactor document (default: REFACTOR_IR.md under the root)
        #[arg(long)]
        ir: Option<PathBuf>,

        /// Characterization test directory
        #[arg(long)]
        tests: Option<PathBuf>,
    },

    /// Show the holes that can be worked on now
    NextHole {
        #[arg(long)]
        ir: Option<PathBuf>,

        /// Also list resolved holes
        #[arg(long)]
        show_all: bool,
    },

    /// Validate a claimed resolution before marking it resolved
    ValidateResolution {
        hole_id: String,

        #[arg(long)]
        ir: Option<PathBuf>,
    },

    /// List dependents of a resolved hole and the constraints to carry forward
    Propagate {
        hole_id: String,

        #[arg(long)]
        ir: Option<PathBuf>,
    },

    /// Render the final refactor report
    GenerateReport {
        #[arg(long)]
        ir: Option<PathBuf>,

        /// Write the report to a file (bare flag: the configured report file)
        #[arg(long)]
        output: Option<Option<PathBuf>>,
    },

    /// Record a status change for a hole in the refactor document
    Mark {
        hole_id: String,

        /// pending, in_progress or resolved
        status: String,

        /// Resolution summary stored with the hole
        #[arg(long)]
        resolution: Option<String>,

        #[arg(long)]
        ir: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::DiscoveryCheck { ir, tests } => {
            cmd::discovery::run(&root, ir.as_deref(), tests.as_deref(), cli.json)
        }
        Commands::NextHole { ir, show_all } => {
            cmd::next::run(&root, ir.as_deref(), show_all, cli.json)
        }
        Commands::ValidateResolution { hole_id, ir } => {
            cmd::validate::run(&root, &hole_id, ir.as_deref(), cli.json)
        }
        Commands::Propagate { hole_id, ir } => {
            cmd::propagate::run(&root, &hole_id, ir.as_deref(), cli.json)
        }
        Commands::GenerateReport { ir, output } => {
            cmd::report::run(&root, ir.as_deref(), output, cli.json)
        }
        Commands::Mark {
            hole_id,
            status,
            resolution,
            ir,
        } => cmd::mark::run(
            &root,
            &hole_id,
            &status,
            resolution.as_deref(),
            ir.as_deref(),
            cli.json,
        ),
    };

    match result {
        Ok(cmd::Outcome::Pass) => {}
        Ok(cmd::Outcome::Fail) => std::process::exit(1),
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}
