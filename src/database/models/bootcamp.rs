use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{is_email, require_text, Model, ModelError};

/// Fields the server derives; stripped from every client payload.
pub const DERIVED_FIELDS: &[&str] = &["slug", "averageCost", "averageRating", "user", "location"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Career {
    #[serde(rename = "Web Development")]
    WebDevelopment,
    #[serde(rename = "Mobile Development")]
    MobileDevelopment,
    #[serde(rename = "UI/UX")]
    UiUx,
    #[serde(rename = "Data Science")]
    DataScience,
    Business,
    Other,
}

/// Geocoded point; `coordinates` is `[longitude, latitude]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoLocation {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [f64; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl GeoLocation {
    pub fn point(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [longitude, latitude],
            formatted_address: None,
            street: None,
            city: None,
            state: None,
            zipcode: None,
            country: None,
        }
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bootcamp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocation>,
    pub careers: Vec<Career>,
    #[serde(default)]
    pub housing: bool,
    #[serde(default)]
    pub job_assistance: bool,
    #[serde(default)]
    pub job_guarantee: bool,
    #[serde(default)]
    pub accept_gi: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_cost: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Model for Bootcamp {
    fn validate(&self) -> Result<(), ModelError> {
        require_text("name", &self.name, Some(50))?;
        require_text("description", &self.description, Some(500))?;

        if let Some(website) = &self.website {
            let valid = url::Url::parse(website)
                .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
                .unwrap_or(false);
            if !valid {
                return Err(ModelError::invalid("Please use a valid URL with HTTP or HTTPS"));
            }
        }
        if let Some(phone) = &self.phone {
            if phone.chars().count() > 20 {
                return Err(ModelError::invalid("Phone number can not be longer than 20 characters"));
            }
        }
        if let Some(email) = &self.email {
            if !is_email(email) {
                return Err(ModelError::invalid("Please add a valid email"));
            }
        }
        if self.careers.is_empty() {
            return Err(ModelError::invalid("Please add at least one career"));
        }
        if let Some(rating) = self.average_rating {
            if !(0.0..=10.0).contains(&rating) {
                return Err(ModelError::invalid("Average rating must be between 0 and 10"));
            }
        }
        if matches!(self.average_cost, Some(cost) if cost < 0) {
            return Err(ModelError::invalid("Average cost can not be negative"));
        }
        Ok(())
    }
}

/// Lowercase, dash separated form of a bootcamp name.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: serde_json::Value) -> crate::database::store::Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify("Devworks Bootcamp"), "devworks-bootcamp");
        assert_eq!(slugify("  ModernTech -- Bootcamp! "), "moderntech-bootcamp");
        assert_eq!(slugify("UI/UX Lab"), "ui-ux-lab");
    }

    #[test]
    fn defaults_are_filled_and_unknown_fields_dropped() {
        let bootcamp = Bootcamp::from_document(&document(json!({
            "name": "Devworks",
            "description": "Full stack",
            "careers": ["Web Development", "UI/UX"],
            "mascot": "otter"
        })))
        .unwrap();
        let stored = bootcamp.to_document().unwrap();
        assert_eq!(stored["housing"], json!(false));
        assert_eq!(stored["careers"], json!(["Web Development", "UI/UX"]));
        assert!(!stored.contains_key("mascot"));
        assert!(!stored.contains_key("averageCost"));
    }

    #[test]
    fn rejects_bad_fields() {
        let base = json!({"name": "Devworks", "description": "d", "careers": ["Business"]});

        let mut missing = base.clone();
        missing.as_object_mut().unwrap().remove("description");
        assert!(Bootcamp::from_document(&document(missing)).is_err());

        let mut bad_career = base.clone();
        bad_career["careers"] = json!(["Astrology"]);
        assert!(Bootcamp::from_document(&document(bad_career)).is_err());

        let mut long_name = base.clone();
        long_name["name"] = json!("x".repeat(51));
        assert!(Bootcamp::from_document(&document(long_name)).is_err());

        let mut bad_site = base.clone();
        bad_site["website"] = json!("ftp://devworks.com");
        assert!(Bootcamp::from_document(&document(bad_site)).is_err());

        let mut no_careers = base;
        no_careers["careers"] = json!([]);
        assert!(Bootcamp::from_document(&document(no_careers)).is_err());
    }
}
