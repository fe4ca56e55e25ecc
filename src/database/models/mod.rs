pub mod bootcamp;
pub mod course;
pub mod review;
pub mod user;

pub use bootcamp::{Bootcamp, Career, GeoLocation};
pub use course::{Course, MinimumSkill};
pub use review::Review;
pub use user::{Role, User};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::database::store::Document;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("{0}")]
    Validation(String),

    #[error("Failed to encode document: {0}")]
    Encoding(String),
}

impl ModelError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ModelError::Validation(message.into())
    }
}

/// Typed view over a stored or submitted document.
pub trait Model: Serialize + DeserializeOwned {
    /// Range, length and shape rules serde cannot express.
    fn validate(&self) -> Result<(), ModelError>;

    /// Decode and validate; type, enum and required-field failures are validation errors.
    fn from_document(document: &Document) -> Result<Self, ModelError> {
        let model: Self = serde_json::from_value(Value::Object(document.clone()))
            .map_err(|e| ModelError::Validation(e.to_string()))?;
        model.validate()?;
        Ok(model)
    }

    /// Canonical stored form: defaults filled in, unknown fields gone.
    fn to_document(&self) -> Result<Document, ModelError> {
        match serde_json::to_value(self).map_err(|e| ModelError::Encoding(e.to_string()))? {
            Value::Object(map) => Ok(map),
            other => Err(ModelError::Encoding(format!("expected object, found {}", other))),
        }
    }
}

pub(crate) fn require_text(field: &str, value: &str, max_len: Option<usize>) -> Result<(), ModelError> {
    if value.trim().is_empty() {
        return Err(ModelError::invalid(format!("Please add a {}", field)));
    }
    if let Some(max) = max_len {
        if value.chars().count() > max {
            return Err(ModelError::invalid(format!("{} can not be more than {} characters", field, max)));
        }
    }
    Ok(())
}

/// `local@domain.tld` with no whitespace and a 2+ letter top-level domain.
pub(crate) fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || value.chars().any(char::is_whitespace) {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()),
        None => false,
    }
}
