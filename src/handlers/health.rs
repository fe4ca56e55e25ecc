use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use tracing::error;

use crate::error::ApiError;
use crate::server::AppState;

/// GET / - service banner
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "api": "/api/v1"
    }))
}

/// GET /health - 503 while the store can not be reached
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    if let Err(e) = state.store.health_check().await {
        error!("Health check failed: {}", e);
        return Err(ApiError::service_unavailable("Database temporarily unavailable"));
    }
    Ok(Json(json!({
        "success": true,
        "status": "ok",
        "store": state.store.backend()
    })))
}
