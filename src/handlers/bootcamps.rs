use axum::extract::{Path, State};
use serde_json::{Map, Value};

use crate::database::store::Document;
use crate::error::ApiError;
use crate::handlers::{body, params, parse_id, Body, Params};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::server::AppState;
use crate::services::BootcampService;

/// GET /api/v1/bootcamps - list with filtering, paging and embedded courses
pub async fn list(State(state): State<AppState>, query: Params) -> ApiResult<Vec<Map<String, Value>>> {
    let listing = BootcampService::new(&state).list(&params(query)?).await?;
    Ok(ApiResponse::listing(listing))
}

/// GET /api/v1/bootcamps/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Document> {
    let id = parse_id(&id)?;
    Ok(ApiResponse::success(BootcampService::new(&state).get(id).await?))
}

/// POST /api/v1/bootcamps - publishers and admins
pub async fn create(State(state): State<AppState>, user: AuthUser, payload: Body) -> ApiResult<Document> {
    let created = BootcampService::new(&state).create(&user, body(payload)?).await?;
    Ok(ApiResponse::created(created))
}

/// PUT /api/v1/bootcamps/:id - owner or admin
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Body,
) -> ApiResult<Document> {
    let id = parse_id(&id)?;
    let updated = BootcampService::new(&state).update(&user, id, body(payload)?).await?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/v1/bootcamps/:id - owner or admin; removes its courses and reviews too
pub async fn delete(State(state): State<AppState>, user: AuthUser, Path(id): Path<String>) -> ApiResult<Value> {
    let id = parse_id(&id)?;
    BootcampService::new(&state).delete(&user, id).await?;
    Ok(ApiResponse::empty())
}

/// GET /api/v1/bootcamps/radius/:zipcode/:distance - distance in miles
pub async fn radius(
    State(state): State<AppState>,
    Path((zipcode, distance)): Path<(String, String)>,
) -> ApiResult<Vec<Document>> {
    let distance: f64 = distance
        .parse()
        .map_err(|_| ApiError::validation(format!("Invalid distance: {}", distance)))?;
    let found = BootcampService::new(&state).within_radius(&zipcode, distance).await?;
    let count = found.len();
    Ok(ApiResponse::success(found).with_count(count))
}
