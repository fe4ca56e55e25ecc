use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{require_text, Model, ModelError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub title: String,
    pub text: String,
    pub rating: i64,
    pub bootcamp: Uuid,
    pub user: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Model for Review {
    fn validate(&self) -> Result<(), ModelError> {
        require_text("title for the review", &self.title, Some(100))?;
        require_text("text for the review", &self.text, None)?;
        if !(1..=10).contains(&self.rating) {
            return Err(ModelError::invalid("Please add a rating between 1 and 10"));
        }
        Ok(())
    }
}
