//! `deploykit`, the single-node deployment agent CLI.
//!
//! Deploys an application bundle into a versioned slot, supervises the
//! application process, and preserves configured folders across version
//! switches. Pipeline commands (`deploy`, `rollback`, `run`) keep the
//! agent in the foreground streaming the application's output until the
//! process exits or Ctrl+C stops it.

mod commands;

use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "deploykit", version, about = "Single-node deployment agent")]
pub struct Cli {
    /// Agent data directory (deployments, persistent folders, config).
    #[arg(long, global = true, default_value = "data")]
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy an application bundle and run it
    Deploy {
        /// Path to the zip bundle
        archive: PathBuf,
    },
    /// Roll back to a retained deployment and run it
    Rollback {
        /// Deployment name, as listed by `deployments`
        version: String,
    },
    /// Run the current deployment until interrupted
    Run,
    /// Show agent status
    Status {
        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },
    /// List retained deployments, newest first
    Deployments,
    /// Update agent configuration
    Config {
        /// Start command for the application
        #[arg(long)]
        command: Option<String>,
        /// Environment file to apply on start; empty to clear
        #[arg(long)]
        env: Option<String>,
        /// Comma-separated persistent folder paths; empty to clear
        #[arg(long)]
        persistent_folders: Option<String>,
    },
    /// Manage environment files
    Envs {
        #[command(subcommand)]
        command: EnvsCommand,
    },
}

#[derive(Subcommand)]
pub enum EnvsCommand {
    /// List environment files
    List,
    /// Print an environment file
    Show { name: String },
    /// Create or replace an environment file from a local file
    Set { name: String, file: PathBuf },
    /// Delete an environment file
    Delete { name: String },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    commands::run(cli).await
}
