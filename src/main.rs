use bootcamp_api::cli::{self, Cli};
use bootcamp_api::config::AppConfig;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so DATABASE_URL, JWT_SECRET etc. apply to cargo run
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = AppConfig::from_env();
    config.validate()?;
    tracing::info!("Starting bootcamp API in {:?} mode", config.environment);

    if let Err(e) = cli::run(cli, config).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
