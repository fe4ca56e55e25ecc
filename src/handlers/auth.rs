use axum::extract::State;
use serde_json::Value;

use crate::database::store::Document;
use crate::handlers::{body, Body};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::server::AppState;
use crate::services::UserService;

/// POST /api/v1/auth/register
///
/// Creates a `user` or `publisher` account and answers `{ success, token }`.
pub async fn register(State(state): State<AppState>, payload: Body) -> ApiResult<Value> {
    let token = UserService::new(&state).register(body(payload)?).await?;
    Ok(ApiResponse::token(token).with_status(axum::http::StatusCode::CREATED))
}

/// POST /api/v1/auth/login
///
/// Exchanges `{ email, password }` for a bearer token. Unknown e-mail and
/// wrong password produce the same 401.
pub async fn login(State(state): State<AppState>, payload: Body) -> ApiResult<Value> {
    let token = UserService::new(&state).login(&body(payload)?).await?;
    Ok(ApiResponse::token(token))
}

/// GET /api/v1/auth/me
pub async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<Document> {
    Ok(ApiResponse::success(UserService::new(&state).me(&user).await?))
}

/// PUT /api/v1/auth/updatedetails
pub async fn update_details(State(state): State<AppState>, user: AuthUser, payload: Body) -> ApiResult<Document> {
    let updated = UserService::new(&state).update_details(&user, body(payload)?).await?;
    Ok(ApiResponse::success(updated))
}

/// PUT /api/v1/auth/updatepassword
///
/// Takes `{ currentPassword, newPassword }` and answers a fresh token.
pub async fn update_password(State(state): State<AppState>, user: AuthUser, payload: Body) -> ApiResult<Value> {
    let token = UserService::new(&state).update_password(&user, &body(payload)?).await?;
    Ok(ApiResponse::token(token))
}

/// GET /api/v1/auth/logout
///
/// Tokens are bearer-only and never stored, so there is nothing to revoke.
pub async fn logout(user: AuthUser) -> ApiResult<Value> {
    tracing::debug!(user = %user.id, "logout");
    Ok(ApiResponse::empty())
}
