//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod ingest;
mod init;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings, LoadOptions};

#[derive(Parser)]
#[command(name = "spectator")]
#[command(about = "Scanned document ingestion and annotation server")]
#[command(version)]
pub struct Cli {
    /// Data directory (overrides SPECTATOR_DATA_DIR and the config file)
    #[arg(long, short = 'd', global = true)]
    data_dir: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Start the HTTP API and ingestion worker
    Serve {
        /// Address to bind (port, host, or host:port; defaults to config)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Rasterize, recognize and ingest a single file
    Ingest {
        /// File to ingest (PDF or image)
        file: PathBuf,
        /// Display name (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Ingest a directory of already rendered page-N.png / page-N.tsv files
    IngestPages {
        /// Directory containing the rendered pages
        dir: PathBuf,
        /// Display name of the document
        #[arg(short, long)]
        name: String,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        data_dir: cli.data_dir,
    };
    let settings = load_settings(options).await?;

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| settings.bind.clone());
            serve::cmd_serve(&settings, &bind).await
        }
        Commands::Ingest { file, name } => {
            ingest::cmd_ingest(&settings, &file, name.as_deref()).await
        }
        Commands::IngestPages { dir, name } => {
            ingest::cmd_ingest_pages(&settings, &dir, &name).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_commands() {
        let cli = Cli::try_parse_from(["spectator", "-v", "serve", "--bind", "9000"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Serve { bind: Some(ref b) } if b == "9000"));

        let cli =
            Cli::try_parse_from(["spectator", "ingest-pages", "out", "--name", "memo"]).unwrap();
        assert!(matches!(cli.command, Commands::IngestPages { ref name, .. } if name == "memo"));

        assert!(Cli::try_parse_from(["spectator", "ingest-pages", "out"]).is_err());
    }
}
