use serde_json::Value;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::aggregate::AggregateRule;
use crate::database::models::{Course, Model, Role};
use crate::database::record::Record;
use crate::database::repository::Repository;
use crate::database::store::{Collection, Document};
use crate::error::ApiError;
use crate::filter::Filter;
use crate::middleware::AuthUser;
use crate::server::AppState;
use crate::services::listing::Listing;
use crate::services::populate::Populate;

/// Set by the server from the route and the caller, never by the payload.
const OWNED_FIELDS: &[&str] = &["bootcamp", "user"];

pub struct CourseService {
    state: AppState,
    courses: Repository,
    bootcamps: Repository,
}

impl CourseService {
    pub fn new(state: &AppState) -> Self {
        Self {
            state: state.clone(),
            courses: state.repository(Collection::Courses),
            bootcamps: state.repository(Collection::Bootcamps),
        }
    }

    /// All courses, or those of one bootcamp, with the bootcamp summarized inline.
    pub async fn list(&self, bootcamp: Option<Uuid>, params: &HashMap<String, String>) -> Result<Listing, ApiError> {
        let mut filter = Filter::from_query(params, &self.state.config.filter)?;
        if let Some(bootcamp_id) = bootcamp {
            self.bootcamps.select_404(bootcamp_id).await?;
            filter = filter.where_eq("bootcamp", bootcamp_id.to_string());
        }
        let mut listing = Listing::fetch(&self.courses, &filter).await?;
        Populate::BOOTCAMP_SUMMARY.apply(&self.state.store, &mut listing.records).await?;
        Ok(listing)
    }

    pub async fn get(&self, id: Uuid) -> Result<Document, ApiError> {
        let mut found = vec![self.courses.select_404(id).await?];
        Populate::BOOTCAMP_SUMMARY.apply(&self.state.store, &mut found).await?;
        Ok(found.swap_remove(0))
    }

    pub async fn create(&self, user: &AuthUser, bootcamp_id: Uuid, input: Value) -> Result<Document, ApiError> {
        user.authorize(&[Role::Publisher, Role::Admin])?;
        let bootcamp = self.bootcamps.select_404(bootcamp_id).await?;
        user.ensure_owner(&bootcamp, &format!("add a course to bootcamp {}", bootcamp_id))?;

        let mut record = Record::from_input(input, OWNED_FIELDS)?;
        record.set("bootcamp", bootcamp_id.to_string());
        record.set("user", user.id.to_string());

        let document = Course::from_document(record.fields())?.to_document()?;
        let created = self.courses.create(document).await?;
        info!(bootcamp = %bootcamp_id, course = ?created.get("id"), "course created");

        self.state.aggregates().refresh(&AggregateRule::AVERAGE_COST, bootcamp_id).await;
        Ok(created)
    }

    pub async fn update(&self, user: &AuthUser, id: Uuid, input: Value) -> Result<Document, ApiError> {
        let stored = self.courses.select_404(id).await?;
        user.ensure_owner(&stored, &format!("update course {}", id))?;

        if let Some(requested) = input.get("bootcamp") {
            if Some(requested) != stored.get("bootcamp") {
                return Err(ApiError::validation("A course can not be moved to another bootcamp"));
            }
        }

        let mut record = Record::from_stored(stored);
        record.apply_input(input, OWNED_FIELDS)?;
        let course = Course::from_document(record.fields())?;
        record.normalize(course.to_document()?);

        if !record.has_changes() {
            return Ok(record.into_document());
        }
        let tuition_changed = record.changed("tuition");
        let updated = self.courses.update_404(id, record.changes()).await?;

        if tuition_changed {
            self.state.aggregates().refresh(&AggregateRule::AVERAGE_COST, course.bootcamp).await;
        }
        Ok(updated)
    }

    pub async fn delete(&self, user: &AuthUser, id: Uuid) -> Result<(), ApiError> {
        let stored = self.courses.select_404(id).await?;
        user.ensure_owner(&stored, &format!("delete course {}", id))?;
        let course = Course::from_document(&stored)?;

        self.courses.delete_404(id).await?;
        self.state.aggregates().refresh(&AggregateRule::AVERAGE_COST, course.bootcamp).await;
        Ok(())
    }
}
