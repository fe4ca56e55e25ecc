//! HTTP handlers, one module per resource.
//!
//! Handlers only translate between HTTP and the services: they parse path
//! ids, unwrap bodies and wrap results in the response envelope. Access
//! rules live in the services.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::ApiError;

pub mod auth;
pub mod bootcamps;
pub mod courses;
pub mod health;
pub mod reviews;
pub mod users;

/// JSON request body; malformed bodies become a validation failure.
pub type Body = Result<Json<Value>, JsonRejection>;

/// Raw query string parameters for the filter engine.
pub type Params = Result<Query<HashMap<String, String>>, QueryRejection>;

/// Path ids must be UUIDs; anything else is reported back verbatim.
pub fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::malformed_identity(raw))
}

pub(crate) fn body(payload: Body) -> Result<Value, ApiError> {
    let Json(value) = payload?;
    Ok(value)
}

pub(crate) fn params(query: Params) -> Result<HashMap<String, String>, ApiError> {
    let Query(params) = query?;
    Ok(params)
}
