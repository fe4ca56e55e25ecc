use axum::extract::{Path, State};
use serde_json::{Map, Value};

use crate::database::store::Document;
use crate::handlers::{body, params, parse_id, Body, Params};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::server::AppState;
use crate::services::UserService;

// Admin only; the role check happens in UserService.

pub async fn list(State(state): State<AppState>, admin: AuthUser, query: Params) -> ApiResult<Vec<Map<String, Value>>> {
    let listing = UserService::new(&state).list(&admin, &params(query)?).await?;
    Ok(ApiResponse::listing(listing))
}

pub async fn get(State(state): State<AppState>, admin: AuthUser, Path(id): Path<String>) -> ApiResult<Document> {
    let id = parse_id(&id)?;
    Ok(ApiResponse::success(UserService::new(&state).get(&admin, id).await?))
}

pub async fn create(State(state): State<AppState>, admin: AuthUser, payload: Body) -> ApiResult<Document> {
    let created = UserService::new(&state).create(&admin, body(payload)?).await?;
    Ok(ApiResponse::created(created))
}

pub async fn update(
    State(state): State<AppState>,
    admin: AuthUser,
    Path(id): Path<String>,
    payload: Body,
) -> ApiResult<Document> {
    let id = parse_id(&id)?;
    let updated = UserService::new(&state).update(&admin, id, body(payload)?).await?;
    Ok(ApiResponse::success(updated))
}

pub async fn delete(State(state): State<AppState>, admin: AuthUser, Path(id): Path<String>) -> ApiResult<Value> {
    let id = parse_id(&id)?;
    UserService::new(&state).delete(&admin, id).await?;
    Ok(ApiResponse::empty())
}
