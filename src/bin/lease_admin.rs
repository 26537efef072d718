//! One-shot command line entrypoint.
//!
//! Runs the same handlers as the HTTP server against a single object or record, and exposes the
//! destructive bulk-clear of the metadata collection.
use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lease_pipeline::{app::AppState, config, event::StorageObject, logging};

#[derive(Parser)]
#[command(
    name = "lease-admin",
    about = "Run lease pipeline handlers from the command line"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract metadata for one uploaded PDF.
    Extract {
        #[arg(long)]
        bucket: String,
        #[arg(long)]
        name: String,
    },
    /// Stage and import one lease record read from a JSON file.
    Refresh {
        #[arg(long)]
        file: PathBuf,
    },
    /// Delete every document in the metadata collection.
    Clear {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing();
    let config = config::init_config().context("failed to load configuration")?;
    let state = AppState::from_config(config).context("failed to initialize Google clients")?;

    let detail = match cli.command {
        Command::Extract { bucket, name } => state
            .extractor
            .handle_object(&StorageObject { bucket, name })
            .await
            .to_string(),
        Command::Refresh { file } => {
            let payload = fs::read_to_string(&file)
                .with_context(|| format!("failed to read record at {}", file.display()))?;
            state
                .refresher
                .refresh(&payload)
                .await
                .context("refresh failed")?
                .to_string()
        }
        Command::Clear { yes } => {
            if !yes {
                anyhow::bail!("refusing to clear the collection without --yes");
            }
            state.extractor.clear().await.to_string()
        }
    };

    println!("{detail}");
    Ok(())
}
