use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::AuthError;
use crate::database::models::{Model, Role, User};
use crate::database::store::{Collection, Document};
use crate::error::ApiError;
use crate::server::AppState;

/// Caller identity resolved from a bearer token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn authorize(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "User role {} is not authorized to access this route",
                self.role.as_str()
            )))
        }
    }

    /// Writes need the caller to own `document` (its `user` field) or be an admin.
    pub fn ensure_owner(&self, document: &Document, action: &str) -> Result<(), ApiError> {
        let owner = document.get("user").and_then(Value::as_str);
        if self.is_admin() || owner == Some(self.id.to_string().as_str()) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "User {} is not authorized to {}",
                self.id, action
            )))
        }
    }
}

/// Resolve the bearer token to a live user and attach it to the request.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_jwt_from_headers(&headers)?;
    let claims = state.tokens.verify(&token)?;

    // Role comes from the stored user so demotions apply to outstanding tokens
    let stored = state
        .store
        .find_by_id(Collection::Users, claims.sub)
        .await?
        .ok_or(AuthError::InvalidToken("unknown subject".to_string()))?;
    let user = User::from_document(&stored).map_err(ApiError::internal)?;

    request.extensions_mut().insert(AuthUser {
        id: claims.sub,
        role: user.role,
    });

    Ok(next.run(request).await)
}

fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, AuthError> {
    let auth_str = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::MissingToken)?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(AuthError::MissingToken),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::from(AuthError::MissingToken))
    }
}
