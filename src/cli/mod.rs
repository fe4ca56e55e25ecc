pub mod commands;

use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

use crate::config::AppConfig;
use crate::database::{MemoryStore, PgStore, RecordStore};

#[derive(Parser)]
#[command(name = "bootcamp-api")]
#[command(about = "Bootcamp directory API server and data tools")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Start the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port override; defaults to PORT or the environment preset")]
        port: Option<u16>,
    },

    #[command(about = "Load or wipe fixture data")]
    Seed {
        #[command(subcommand)]
        cmd: commands::seed::SeedCommands,
    },
}

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => commands::serve::handle(config, port).await,
        Commands::Seed { cmd } => commands::seed::handle(cmd, config).await,
    }
}

/// Postgres when `DATABASE_URL` is configured, otherwise an empty in-memory store.
pub async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn RecordStore>> {
    if config.database.url.is_some() {
        let store = PgStore::connect(&config.database).await?;
        info!("Connected to Postgres");
        Ok(Arc::new(store))
    } else {
        info!("DATABASE_URL not set, using the in-memory store");
        Ok(Arc::new(MemoryStore::new()))
    }
}
