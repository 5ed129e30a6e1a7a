#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that drives Cluster Conductor sessions.

mod catalog;
mod placement_transfer;
mod report;
mod script;

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cluster_conductor_core::{DEFAULT_REVEAL_QUOTA, WELCOME_BANNER};
use cluster_conductor_system_session::{Session, SessionConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{placement_transfer::PlacementSnapshot, report::StatusReport};

#[derive(Parser, Debug)]
#[command(
    name = "cluster-conductor",
    author,
    version,
    about = "Schedule pods onto nodes until every objective holds",
    long_about = None
)]
struct Cli {
    /// Level catalog in TOML; the bundled demo catalog is used when omitted.
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Solution reveals granted per run.
    #[arg(long, global = true, default_value_t = DEFAULT_REVEAL_QUOTA)]
    reveal_quota: u8,

    /// Print the final state as JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the levels of the catalog.
    Levels,
    /// Run a session script and print the final state.
    Play {
        /// Script with one action per line.
        #[arg(long)]
        script: PathBuf,
    },
    /// Run a session script and print the resulting placement string.
    Export {
        /// Script with one action per line.
        #[arg(long)]
        script: PathBuf,
    },
    /// Replay a placement string into a fresh session.
    Import {
        /// String produced by `export`.
        code: String,
    },
}

/// Entry point for the Cluster Conductor command-line interface.
fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let catalog = catalog::load(cli.catalog.as_deref())?;
    let config = SessionConfig {
        reveal_quota: cli.reveal_quota,
        ..SessionConfig::default()
    };
    let mut session = Session::with_config(catalog, config);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Levels => {
            writeln!(out, "{WELCOME_BANNER}")?;
            for (index, level) in session.catalog().iter().enumerate() {
                writeln!(out, "{:>2}. {}", index + 1, level.name)?;
            }
            return Ok(());
        }
        Commands::Play { script } => {
            writeln!(out, "{WELCOME_BANNER}")?;
            let steps = load_script(&script)?;
            info!(steps = steps.len(), "running session script");
            script::run(&mut session, &steps, &mut out)?;
        }
        Commands::Export { script } => {
            let steps = load_script(&script)?;
            script::run(&mut session, &steps, &mut io::sink())?;
            let snapshot = PlacementSnapshot::capture(&session.current_state())
                .context("script finished without a loaded level")?;
            writeln!(out, "{}", snapshot.encode()?)?;
            return Ok(());
        }
        Commands::Import { code } => {
            writeln!(out, "{WELCOME_BANNER}")?;
            script::import(&mut session, &code, &mut out)?;
        }
    }

    let state = session.current_state();
    if cli.json {
        let json = serde_json::to_string_pretty(&state).context("failed to serialise state")?;
        writeln!(out, "{json}")?;
    } else {
        write!(out, "{}", StatusReport(&state))?;
    }
    Ok(())
}

fn load_script(path: &Path) -> Result<Vec<script::Step>> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    script::parse(&source).with_context(|| format!("invalid script {}", path.display()))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
