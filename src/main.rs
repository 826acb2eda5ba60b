//! Cailianpress telegraph archiver — binary entrypoint.
//!
//! One invocation runs one pipeline pass; periodic execution is the job of
//! whatever scheduler invokes the binary.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cls_telegraph::archive::ArchiveStore;
use cls_telegraph::config::AppConfig;
use cls_telegraph::{export, pipeline, rollup};

#[derive(Parser)]
#[command(name = "cls-telegraph", about = "Fetch, archive and forward Cailianpress telegraphs")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Full pipeline: fetch, merge into the dated archives, prune, rollup, notify.
    Run,
    /// Rebuild the 5-day rollup document from the existing archives.
    Rollup,
    /// Regenerate the JSON export files for the viewer app.
    Export,
    /// Retention sweep only.
    Prune {
        /// Number of dated archive files to keep.
        #[arg(long)]
        keep: Option<usize>,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cls_telegraph=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let cfg = AppConfig::from_env()?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => pipeline::run_once(&cfg).await?,
        Command::Rollup => {
            let store = ArchiveStore::new(&cfg.output_dir)?;
            rollup::build_rollup(&store)?;
        }
        Command::Export => {
            let store = ArchiveStore::new(&cfg.output_dir)?;
            export::generate_exports(&store)?;
        }
        Command::Prune { keep } => {
            let store = ArchiveStore::new(&cfg.output_dir)?;
            store.prune_old(keep.unwrap_or(cfg.retention));
        }
    }
    Ok(())
}
