use axum::extract::{Path, State};
use serde_json::{Map, Value};

use crate::database::store::Document;
use crate::handlers::{body, params, parse_id, Body, Params};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::server::AppState;
use crate::services::CourseService;

/// GET /api/v1/courses
pub async fn list(State(state): State<AppState>, query: Params) -> ApiResult<Vec<Map<String, Value>>> {
    let listing = CourseService::new(&state).list(None, &params(query)?).await?;
    Ok(ApiResponse::listing(listing))
}

/// GET /api/v1/bootcamps/:id/courses
pub async fn list_for_bootcamp(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<String>,
    query: Params,
) -> ApiResult<Vec<Map<String, Value>>> {
    let bootcamp_id = parse_id(&bootcamp_id)?;
    let listing = CourseService::new(&state)
        .list(Some(bootcamp_id), &params(query)?)
        .await?;
    Ok(ApiResponse::listing(listing))
}

/// GET /api/v1/courses/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Document> {
    let id = parse_id(&id)?;
    Ok(ApiResponse::success(CourseService::new(&state).get(id).await?))
}

/// POST /api/v1/bootcamps/:id/courses - the bootcamp's owner or an admin
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Path(bootcamp_id): Path<String>,
    payload: Body,
) -> ApiResult<Document> {
    let bootcamp_id = parse_id(&bootcamp_id)?;
    let created = CourseService::new(&state)
        .create(&user, bootcamp_id, body(payload)?)
        .await?;
    Ok(ApiResponse::created(created))
}

/// PUT /api/v1/courses/:id
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Body,
) -> ApiResult<Document> {
    let id = parse_id(&id)?;
    let updated = CourseService::new(&state).update(&user, id, body(payload)?).await?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/v1/courses/:id
pub async fn delete(State(state): State<AppState>, user: AuthUser, Path(id): Path<String>) -> ApiResult<Value> {
    let id = parse_id(&id)?;
    CourseService::new(&state).delete(&user, id).await?;
    Ok(ApiResponse::empty())
}
