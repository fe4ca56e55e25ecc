use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::models::bootcamp::{slugify, DERIVED_FIELDS};
use crate::database::models::{Bootcamp, GeoLocation, Model, Role};
use crate::database::record::Record;
use crate::database::repository::Repository;
use crate::database::store::{Collection, Document, RecordStore};
use crate::error::ApiError;
use crate::filter::Filter;
use crate::middleware::AuthUser;
use crate::server::AppState;
use crate::services::geocoder::{distance_miles, Geocoder};
use crate::services::listing::Listing;
use crate::services::populate::Populate;

pub struct BootcampService {
    state: AppState,
    bootcamps: Repository,
}

impl BootcampService {
    pub fn new(state: &AppState) -> Self {
        Self {
            state: state.clone(),
            bootcamps: state.repository(Collection::Bootcamps),
        }
    }

    fn store(&self) -> &Arc<dyn RecordStore> {
        &self.state.store
    }

    fn geocoder(&self) -> &Arc<dyn Geocoder> {
        &self.state.geocoder
    }

    pub async fn list(&self, params: &HashMap<String, String>) -> Result<Listing, ApiError> {
        let filter = Filter::from_query(params, &self.state.config.filter)?;
        let mut listing = Listing::fetch(&self.bootcamps, &filter).await?;
        if Populate::BOOTCAMP_COURSES.wanted_by(&filter) {
            Populate::BOOTCAMP_COURSES.apply(self.store(), &mut listing.records).await?;
        }
        Ok(listing)
    }

    pub async fn get(&self, id: Uuid) -> Result<Document, ApiError> {
        Ok(self.bootcamps.select_404(id).await?)
    }

    pub async fn create(&self, user: &AuthUser, input: Value) -> Result<Document, ApiError> {
        user.authorize(&[Role::Publisher, Role::Admin])?;

        // Publishers get one bootcamp; admins are unlimited
        if !user.is_admin() {
            let owned = self
                .bootcamps
                .count(&Filter::new().where_eq("user", user.id.to_string()))
                .await?;
            if owned > 0 {
                return Err(ApiError::validation(format!(
                    "The user with ID {} has already published a bootcamp",
                    user.id
                )));
            }
        }

        let mut record = Record::from_input(input, DERIVED_FIELDS)?;
        let address = record
            .get_str("address")
            .map(str::to_string)
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| ApiError::validation("Please add an address"))?;

        record.set("user", user.id.to_string());
        if let Some(name) = record.get_str("name").map(slugify) {
            record.set("slug", name);
        }
        if let Some(location) = self.locate(&address).await {
            record.set("location", serde_json::to_value(location).map_err(ApiError::internal)?);
        }

        let document = Bootcamp::from_document(record.fields())?.to_document()?;
        let created = self.bootcamps.create(document).await?;
        info!(bootcamp = ?created.get("id"), "bootcamp created");
        Ok(created)
    }

    pub async fn update(&self, user: &AuthUser, id: Uuid, input: Value) -> Result<Document, ApiError> {
        let stored = self.bootcamps.select_404(id).await?;
        user.ensure_owner(&stored, "update this bootcamp")?;

        let mut record = Record::from_stored(stored);
        record.apply_input(input, DERIVED_FIELDS)?;

        if record.changed("name") {
            if let Some(slug) = record.get_str("name").map(slugify) {
                record.set("slug", slug);
            }
        }
        if record.changed("address") {
            match record.get_str("address").map(str::to_string) {
                Some(address) => match self.locate(&address).await {
                    Some(location) => {
                        record.set("location", serde_json::to_value(location).map_err(ApiError::internal)?);
                    }
                    None => {
                        record.remove("location");
                    }
                },
                None => {
                    record.remove("location");
                }
            }
        }

        let canonical = Bootcamp::from_document(record.fields())?.to_document()?;
        record.normalize(canonical);
        if !record.has_changes() {
            return Ok(record.into_document());
        }
        Ok(self.bootcamps.update_404(id, record.changes()).await?)
    }

    /// Delete a bootcamp together with its courses and reviews.
    pub async fn delete(&self, user: &AuthUser, id: Uuid) -> Result<(), ApiError> {
        let stored = self.bootcamps.select_404(id).await?;
        user.ensure_owner(&stored, "delete this bootcamp")?;

        let children = Filter::new().where_eq("bootcamp", id.to_string());
        let courses = self.state.repository(Collection::Courses).delete_matching(&children).await?;
        let reviews = self.state.repository(Collection::Reviews).delete_matching(&children).await?;
        self.bootcamps.delete_404(id).await?;

        info!(bootcamp = %id, courses, reviews, "bootcamp deleted with children");
        Ok(())
    }

    /// Bootcamps whose location lies within `distance` miles of `zipcode`, nearest first.
    pub async fn within_radius(&self, zipcode: &str, distance: f64) -> Result<Vec<Document>, ApiError> {
        if !distance.is_finite() || distance < 0.0 {
            return Err(ApiError::validation("Distance must be a non-negative number of miles"));
        }
        let center = self
            .geocoder()
            .geocode(zipcode)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Could not locate zipcode {}", zipcode)))?;

        let mut nearby: Vec<(f64, Document)> = self
            .bootcamps
            .select_any(&Filter::new())
            .await?
            .into_iter()
            .filter_map(|doc| {
                let location: GeoLocation = serde_json::from_value(doc.get("location")?.clone()).ok()?;
                let miles = distance_miles(&center, &location);
                (miles <= distance).then_some((miles, doc))
            })
            .collect();
        nearby.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(nearby.into_iter().map(|(_, doc)| doc).collect())
    }

    /// Geocoding problems never block a write; the bootcamp is stored unplaced.
    async fn locate(&self, address: &str) -> Option<GeoLocation> {
        match self.geocoder().geocode(address).await {
            Ok(location) => location,
            Err(e) => {
                warn!("Geocoding '{}' failed: {}", address, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::memory::MemoryStore;
    use crate::services::geocoder::StaticGeocoder;
    use serde_json::json;

    fn state() -> AppState {
        let geocoder = StaticGeocoder::new()
            .with("233 Bay State Rd Boston MA 02215", GeoLocation::point(-71.1, 42.35))
            .with("02118", GeoLocation::point(-71.07, 42.34))
            .with("Providence RI 02903", GeoLocation::point(-71.41, 41.82));
        AppState::new(AppConfig::development(), Arc::new(MemoryStore::new()), Arc::new(geocoder))
    }

    fn publisher() -> AuthUser {
        AuthUser { id: Uuid::new_v4(), role: Role::Publisher }
    }

    fn input(name: &str, address: &str) -> Value {
        json!({
            "name": name,
            "description": "Learn to code",
            "address": address,
            "careers": ["Web Development"],
            "averageCost": 1,
            "slug": "forged"
        })
    }

    #[tokio::test]
    async fn create_derives_fields_and_strips_protected_ones() {
        let service = BootcampService::new(&state());
        let owner = publisher();
        let created = service
            .create(&owner, input("Devworks Bootcamp", "233 Bay State Rd Boston MA 02215"))
            .await
            .unwrap();
        assert_eq!(created["slug"], json!("devworks-bootcamp"));
        assert_eq!(created["user"], json!(owner.id.to_string()));
        assert_eq!(created["location"]["coordinates"], json!([-71.1, 42.35]));
        assert!(!created.contains_key("averageCost"));
        assert_eq!(created["housing"], json!(false));
    }

    #[tokio::test]
    async fn publishers_get_one_bootcamp() {
        let service = BootcampService::new(&state());
        let owner = publisher();
        service.create(&owner, input("First", "Somewhere")).await.unwrap();
        let err = service.create(&owner, input("Second", "Somewhere")).await.unwrap_err();
        assert!(matches!(err, ApiError::ValidationFailed(_)));

        let other_admin = AuthUser { id: Uuid::new_v4(), role: Role::Admin };
        service.create(&other_admin, input("Third", "Somewhere")).await.unwrap();
        service.create(&other_admin, input("Fourth", "Somewhere")).await.unwrap();
    }

    #[tokio::test]
    async fn users_cannot_create_bootcamps() {
        let service = BootcampService::new(&state());
        let user = AuthUser { id: Uuid::new_v4(), role: Role::User };
        let err = service.create(&user, input("Nope", "Somewhere")).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn update_requires_owner_and_reslugs() {
        let service = BootcampService::new(&state());
        let owner = publisher();
        let created = service.create(&owner, input("Old Name", "Somewhere")).await.unwrap();
        let id = Uuid::parse_str(created["id"].as_str().unwrap()).unwrap();

        let err = service
            .update(&publisher(), id, json!({"name": "Hijacked"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let updated = service
            .update(&owner, id, json!({"name": "New Name", "averageRating": 10}))
            .await
            .unwrap();
        assert_eq!(updated["slug"], json!("new-name"));
        assert!(!updated.contains_key("averageRating"));
    }

    #[tokio::test]
    async fn radius_search_orders_by_distance() {
        let state = state();
        let service = BootcampService::new(&state);
        let admin = AuthUser { id: Uuid::new_v4(), role: Role::Admin };
        service.create(&admin, input("Boston", "233 Bay State Rd Boston MA 02215")).await.unwrap();
        service.create(&admin, input("Providence", "Providence RI 02903")).await.unwrap();
        service.create(&admin, input("Nowhere", "unknown address")).await.unwrap();

        let near = service.within_radius("02118", 10.0).await.unwrap();
        assert_eq!(near.len(), 1);
        assert_eq!(near[0]["name"], json!("Boston"));

        let wide = service.within_radius("02118", 100.0).await.unwrap();
        let names: Vec<&str> = wide.iter().map(|d| d["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Boston", "Providence"]);

        let err = service.within_radius("99999", 10.0).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
