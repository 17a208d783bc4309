//! template-audit - flag manifest entries rendered from stale templates

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use figureforge_core::config::{AuditConfig, VisualConfig};
use figureforge_core::qc::{audit_target, run_all};

#[derive(Parser)]
#[command(name = "template-audit")]
#[command(about = "Audit images/manifest.json template versions")]
struct Cli {
    /// Report directories or manifest.json files
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// JSON config; its template_version is the expected version
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Expected template version (overrides config)
    #[arg(long)]
    expect_version: Option<String>,
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
    let audit_config = match cli.expect_version {
        Some(version) => AuditConfig::new(version),
        None => config.audit(),
    };

    let outcome = run_all(&cli.paths, |target| audit_target(target, &audit_config));
    for line in &outcome.lines {
        println!("{}", line);
    }

    if outcome.has_errors {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
