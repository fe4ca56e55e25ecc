use serde::{Deserialize, Serialize};
use serde_json::Number;
use uuid::Uuid;

use super::{require_text, Model, ModelError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MinimumSkill {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub weeks: u32,
    /// Kept as the submitted number so integer tuitions stay integers.
    pub tuition: Number,
    pub minimum_skill: MinimumSkill,
    #[serde(default)]
    pub scholarship_available: bool,
    pub bootcamp: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Course {
    pub fn tuition_value(&self) -> f64 {
        self.tuition.as_f64().unwrap_or(0.0)
    }
}

impl Model for Course {
    fn validate(&self) -> Result<(), ModelError> {
        require_text("course title", &self.title, None)?;
        require_text("description", &self.description, None)?;
        if self.weeks == 0 {
            return Err(ModelError::invalid("Please add number of weeks"));
        }
        if self.tuition_value() < 0.0 {
            return Err(ModelError::invalid("Tuition can not be negative"));
        }
        Ok(())
    }
}
