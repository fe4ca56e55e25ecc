use tokio::net::TcpListener;

use crate::cli::open_store;
use crate::config::AppConfig;
use crate::server::{self, AppState};
use crate::services::geocoder;

pub async fn handle(mut config: AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }

    let store = open_store(&config).await?;
    let geocoder = geocoder::from_config(&config.geocoder);
    let bind_addr = format!("0.0.0.0:{}", config.server.port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;

    server::run(listener, AppState::new(config, store, geocoder)).await?;
    Ok(())
}
