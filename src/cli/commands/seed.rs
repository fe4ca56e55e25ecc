use clap::Subcommand;
use std::path::PathBuf;

use crate::cli::open_store;
use crate::config::AppConfig;
use crate::server::AppState;
use crate::services::{geocoder, SeedService};

#[derive(Subcommand)]
pub enum SeedCommands {
    #[command(about = "Import users, bootcamps, courses and reviews from JSON files")]
    Import {
        #[arg(long, help = "Directory holding users.json, bootcamps.json, courses.json, reviews.json", default_value = "_data")]
        dir: PathBuf,
    },

    #[command(about = "Delete every record of every collection")]
    Destroy,
}

pub async fn handle(cmd: SeedCommands, config: AppConfig) -> anyhow::Result<()> {
    if config.database.url.is_none() {
        anyhow::bail!("Seeding needs DATABASE_URL; the in-memory store does not outlive this command");
    }

    let store = open_store(&config).await?;
    let geocoder = geocoder::from_config(&config.geocoder);
    let service = SeedService::new(&AppState::new(config, store, geocoder));

    match cmd {
        SeedCommands::Import { dir } => {
            let report = service.import(&dir).await?;
            for (collection, count) in &report.imported {
                println!("{:>6} {}", count, collection);
            }
            println!("Recomputed aggregates for {} bootcamps", report.bootcamps_recomputed);
        }
        SeedCommands::Destroy => {
            let removed = service.destroy().await?;
            println!("Deleted {} records", removed);
        }
    }
    Ok(())
}
