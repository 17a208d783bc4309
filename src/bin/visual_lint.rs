//! visual-lint - check injected reports against their visual stats
//!
//! Prints one line per issue (or `<path>: Visual QA OK`) to stdout.
//! Exits non-zero when any ERROR was reported.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use figureforge_core::config::VisualConfig;
use figureforge_core::qc::{lint_target, run_all};

#[derive(Parser)]
#[command(name = "visual-lint")]
#[command(about = "Lint report visual stats (visual_stats.json)")]
struct Cli {
    /// Report directories or visual_stats.json files
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// JSON config overriding required/known anchors
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Required anchor slug (repeatable); replaces the configured set
    #[arg(short, long = "required")]
    required: Vec<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("figureforge_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match VisualConfig::load_or_default(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let lint_config = config.lint().with_required(cli.required);

    let outcome = run_all(&cli.paths, |target| lint_target(target, &lint_config));
    for line in &outcome.lines {
        println!("{}", line);
    }

    if outcome.has_errors {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
