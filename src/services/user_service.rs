use serde_json::Value;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthError;
use crate::database::models::user::{validate_password, HIDDEN_FIELDS};
use crate::database::models::{Model, Role, User};
use crate::database::record::Record;
use crate::database::repository::Repository;
use crate::database::store::{Collection, Document};
use crate::error::ApiError;
use crate::filter::Filter;
use crate::middleware::AuthUser;
use crate::server::AppState;
use crate::services::listing::Listing;

/// Reset tokens are issued by the server only.
const RESET_FIELDS: &[&str] = &["resetPasswordToken", "resetPasswordExpire"];

/// What a caller may change about their own account without an admin.
const DETAIL_FIELDS: &[&str] = &["name", "email"];

/// User accounts: admin management plus registration, login and `me`.
pub struct UserService {
    state: AppState,
    users: Repository,
}

impl UserService {
    pub fn new(state: &AppState) -> Self {
        Self {
            state: state.clone(),
            users: state.repository(Collection::Users),
        }
    }

    pub async fn list(&self, admin: &AuthUser, params: &HashMap<String, String>) -> Result<Listing, ApiError> {
        admin.authorize(&[Role::Admin])?;
        let filter = Filter::from_query(params, &self.state.config.filter)?;
        filter.reject_fields(HIDDEN_FIELDS)?;
        Ok(Listing::fetch(&self.users, &filter).await?.map_records(public_view))
    }

    pub async fn get(&self, admin: &AuthUser, id: Uuid) -> Result<Document, ApiError> {
        admin.authorize(&[Role::Admin])?;
        Ok(public_view(self.users.select_404(id).await?))
    }

    /// Admin-created accounts may carry any role.
    pub async fn create(&self, admin: &AuthUser, input: Value) -> Result<Document, ApiError> {
        admin.authorize(&[Role::Admin])?;
        let created = self.insert(input).await?;
        Ok(public_view(created))
    }

    pub async fn update(&self, admin: &AuthUser, id: Uuid, input: Value) -> Result<Document, ApiError> {
        admin.authorize(&[Role::Admin])?;
        let stored = self.users.select_404(id).await?;

        let mut record = Record::from_stored(stored);
        record.apply_input(input, RESET_FIELDS)?;
        if record.changed("password") {
            let plain = record
                .get_str("password")
                .ok_or_else(|| ApiError::validation("Please add a password"))?
                .to_string();
            validate_password(&plain)?;
            record.set("password", self.state.hasher.hash(&plain)?);
        }
        let user = User::from_document(record.fields())?;
        record.normalize(user.to_document()?);

        if !record.has_changes() {
            return Ok(public_view(record.into_document()));
        }
        Ok(public_view(self.users.update_404(id, record.changes()).await?))
    }

    pub async fn delete(&self, admin: &AuthUser, id: Uuid) -> Result<(), ApiError> {
        admin.authorize(&[Role::Admin])?;
        Ok(self.users.delete_404(id).await?)
    }

    /// Self-service sign-up; the admin role can not be claimed here.
    pub async fn register(&self, input: Value) -> Result<String, ApiError> {
        if input.get("role").and_then(Value::as_str) == Some(Role::Admin.as_str()) {
            return Err(ApiError::validation("The admin role can not be self-assigned"));
        }
        let created = self.insert(input).await?;
        let user = User::from_document(&created)?;
        let id = user.id.ok_or_else(|| ApiError::internal("stored user without id"))?;
        Ok(self.state.tokens.issue(id, user.role)?)
    }

    pub async fn login(&self, input: &Value) -> Result<String, ApiError> {
        let email = input.get("email").and_then(Value::as_str).filter(|s| !s.is_empty());
        let password = input.get("password").and_then(Value::as_str).filter(|s| !s.is_empty());
        let (Some(email), Some(password)) = (email, password) else {
            return Err(ApiError::validation("Please provide an email and password"));
        };

        let stored = self
            .users
            .select_one(&Filter::new().where_eq("email", email))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let user = User::from_document(&stored)?;

        if !self.state.hasher.verify(password, &user.password)? {
            return Err(AuthError::InvalidCredentials.into());
        }
        let id = user.id.ok_or_else(|| ApiError::internal("stored user without id"))?;
        Ok(self.state.tokens.issue(id, user.role)?)
    }

    pub async fn me(&self, caller: &AuthUser) -> Result<Document, ApiError> {
        Ok(public_view(self.users.select_404(caller.id).await?))
    }

    /// Self-service change of name and email; other keys in the body are ignored.
    pub async fn update_details(&self, caller: &AuthUser, input: Value) -> Result<Document, ApiError> {
        let Value::Object(fields) = input else {
            return Err(ApiError::validation("Request body must be a JSON object"));
        };
        let details: serde_json::Map<String, Value> = fields
            .into_iter()
            .filter(|(key, _)| DETAIL_FIELDS.contains(&key.as_str()))
            .collect();

        let stored = self.users.select_404(caller.id).await?;
        let mut record = Record::from_stored(stored);
        record.apply_input(Value::Object(details), RESET_FIELDS)?;
        let user = User::from_document(record.fields())?;
        record.normalize(user.to_document()?);

        if !record.has_changes() {
            return Ok(public_view(record.into_document()));
        }
        Ok(public_view(self.users.update_404(caller.id, record.changes()).await?))
    }

    /// Swap the caller's password after checking the current one; answers a fresh token.
    pub async fn update_password(&self, caller: &AuthUser, input: &Value) -> Result<String, ApiError> {
        let current = input.get("currentPassword").and_then(Value::as_str).filter(|s| !s.is_empty());
        let next = input.get("newPassword").and_then(Value::as_str).filter(|s| !s.is_empty());
        let (Some(current), Some(next)) = (current, next) else {
            return Err(ApiError::validation("Please provide the current and the new password"));
        };

        let stored = self.users.select_404(caller.id).await?;
        let user = User::from_document(&stored)?;
        if !self.state.hasher.verify(current, &user.password)? {
            return Err(ApiError::unauthorized("Password is incorrect"));
        }
        validate_password(next)?;

        let mut record = Record::from_stored(stored);
        record.set("password", self.state.hasher.hash(next)?);
        self.users.update_404(caller.id, record.changes()).await?;
        info!(user = %caller.id, "password changed");

        Ok(self.state.tokens.issue(caller.id, user.role)?)
    }

    /// Validate, hash and store a new account from plain-text input.
    pub async fn insert(&self, input: Value) -> Result<Document, ApiError> {
        let mut record = Record::from_input(input, RESET_FIELDS)?;
        let plain = record
            .get_str("password")
            .ok_or_else(|| ApiError::validation("Please add a password"))?
            .to_string();
        validate_password(&plain)?;
        record.set("password", self.state.hasher.hash(&plain)?);

        let document = User::from_document(record.fields())?.to_document()?;
        Ok(self.users.create(document).await?)
    }
}

/// Strip credentials and reset tokens before a user leaves the server.
pub fn public_view(document: Document) -> Document {
    document
        .into_iter()
        .filter(|(key, _)| !HIDDEN_FIELDS.contains(&key.as_str()))
        .collect()
}
