//! ctxforge: keeps generated AI context docs in step with the source tree.
//!
//! # Usage
//!
//! ```text
//! ctxforge init [--generator template|llm] [--force]
//! ctxforge status [--json]
//! ctxforge update [--dry-run] [--force]
//! ctxforge preview
//! ```
//!
//! Global flags: `-C <path>` to run against another repository, `-v` for
//! debug logging (`RUST_LOG` takes precedence).

mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{init::InitArgs, preview::PreviewArgs, status::StatusArgs, update::UpdateArgs};
use ctxforge_core::GeneratorKind;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "ctxforge",
    version,
    about = "Detect stale AI context docs and regenerate only what changed",
    long_about = None,
)]
struct Cli {
    /// Run as if started in <PATH>.
    #[arg(short = 'C', long = "repo", value_name = "PATH", global = true)]
    repo: Option<PathBuf>,

    /// Debug logging on stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the configuration and build the whole artifact tree.
    Init(InitArgs),

    /// Show artifact freshness and the changes waiting to be processed.
    Status(StatusArgs),

    /// Regenerate the artifacts affected by changes since the last run.
    Update(UpdateArgs),

    /// Show what `update` would do without writing anything.
    Preview(PreviewArgs),
}

// ---------------------------------------------------------------------------
// Shared GeneratorKind argument
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse `GeneratorKind` from CLI args.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneratorKindArg(pub GeneratorKind);

impl FromStr for GeneratorKindArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "template" => Ok(Self(GeneratorKind::Template)),
            "llm" => Ok(Self(GeneratorKind::Llm)),
            other => Err(format!(
                "unknown generator '{other}'; expected: template, llm"
            )),
        }
    }
}

impl fmt::Display for GeneratorKindArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            GeneratorKind::Template => f.write_str("template"),
            GeneratorKind::Llm => f.write_str("llm"),
        }
    }
}

impl From<GeneratorKindArg> for GeneratorKind {
    fn from(g: GeneratorKindArg) -> Self {
        g.0
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let start = match cli.repo {
        Some(path) => path,
        None => std::env::current_dir().context("could not determine current directory")?,
    };

    runtime.block_on(async move {
        match cli.command {
            Commands::Init(args) => args.run(&start).await,
            Commands::Status(args) => args.run(&start).await,
            Commands::Update(args) => args.run(&start).await,
            Commands::Preview(args) => args.run(&start).await,
        }
    })
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
