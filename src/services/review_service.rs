use serde_json::Value;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::aggregate::AggregateRule;
use crate::database::models::{Model, Review, Role};
use crate::database::record::Record;
use crate::database::repository::Repository;
use crate::database::store::{Collection, Document};
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::filter::Filter;
use crate::middleware::AuthUser;
use crate::server::AppState;
use crate::services::listing::Listing;
use crate::services::populate::Populate;

const OWNED_FIELDS: &[&str] = &["bootcamp", "user"];

pub struct ReviewService {
    state: AppState,
    reviews: Repository,
    bootcamps: Repository,
}

impl ReviewService {
    pub fn new(state: &AppState) -> Self {
        Self {
            state: state.clone(),
            reviews: state.repository(Collection::Reviews),
            bootcamps: state.repository(Collection::Bootcamps),
        }
    }

    pub async fn list(&self, bootcamp: Option<Uuid>, params: &HashMap<String, String>) -> Result<Listing, ApiError> {
        let mut filter = Filter::from_query(params, &self.state.config.filter)?;
        if let Some(bootcamp_id) = bootcamp {
            self.bootcamps.select_404(bootcamp_id).await?;
            filter = filter.where_eq("bootcamp", bootcamp_id.to_string());
        }
        let mut listing = Listing::fetch(&self.reviews, &filter).await?;
        Populate::BOOTCAMP_SUMMARY.apply(&self.state.store, &mut listing.records).await?;
        Ok(listing)
    }

    pub async fn get(&self, id: Uuid) -> Result<Document, ApiError> {
        let mut found = vec![self.reviews.select_404(id).await?];
        Populate::BOOTCAMP_SUMMARY.apply(&self.state.store, &mut found).await?;
        Ok(found.swap_remove(0))
    }

    /// One review per user and bootcamp; a second attempt is a validation failure.
    pub async fn create(&self, user: &AuthUser, bootcamp_id: Uuid, input: Value) -> Result<Document, ApiError> {
        user.authorize(&[Role::User, Role::Admin])?;
        self.bootcamps.select_404(bootcamp_id).await?;

        let mut record = Record::from_input(input, OWNED_FIELDS)?;
        record.set("bootcamp", bootcamp_id.to_string());
        record.set("user", user.id.to_string());

        let document = Review::from_document(record.fields())?.to_document()?;
        let created = match self.reviews.create(document).await {
            Ok(created) => created,
            Err(DatabaseError::Duplicate(_)) => {
                return Err(ApiError::validation("You have already reviewed this bootcamp"));
            }
            Err(e) => return Err(e.into()),
        };
        info!(bootcamp = %bootcamp_id, review = ?created.get("id"), "review created");

        self.state.aggregates().refresh(&AggregateRule::AVERAGE_RATING, bootcamp_id).await;
        Ok(created)
    }

    pub async fn update(&self, user: &AuthUser, id: Uuid, input: Value) -> Result<Document, ApiError> {
        user.authorize(&[Role::User, Role::Admin])?;
        let stored = self.reviews.select_404(id).await?;
        user.ensure_owner(&stored, &format!("update review {}", id))?;

        let mut record = Record::from_stored(stored);
        record.apply_input(input, OWNED_FIELDS)?;
        let review = Review::from_document(record.fields())?;
        record.normalize(review.to_document()?);

        if !record.has_changes() {
            return Ok(record.into_document());
        }
        let rating_changed = record.changed("rating");
        let updated = self.reviews.update_404(id, record.changes()).await?;

        if rating_changed {
            self.state.aggregates().refresh(&AggregateRule::AVERAGE_RATING, review.bootcamp).await;
        }
        Ok(updated)
    }

    pub async fn delete(&self, user: &AuthUser, id: Uuid) -> Result<(), ApiError> {
        user.authorize(&[Role::User, Role::Admin])?;
        let stored = self.reviews.select_404(id).await?;
        user.ensure_owner(&stored, &format!("delete review {}", id))?;
        let review = Review::from_document(&stored)?;

        self.reviews.delete_404(id).await?;
        self.state.aggregates().refresh(&AggregateRule::AVERAGE_RATING, review.bootcamp).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::memory::MemoryStore;
    use crate::services::bootcamp_service::BootcampService;
    use crate::services::geocoder::DisabledGeocoder;
    use serde_json::json;
    use std::sync::Arc;

    async fn setup() -> (AppState, Uuid) {
        let state = AppState::new(AppConfig::development(), Arc::new(MemoryStore::new()), Arc::new(DisabledGeocoder));
        let owner = AuthUser { id: Uuid::new_v4(), role: Role::Publisher };
        let bootcamp = BootcampService::new(&state)
            .create(
                &owner,
                json!({"name": "Devworks", "description": "d", "address": "a", "careers": ["Other"]}),
            )
            .await
            .unwrap();
        let id = Uuid::parse_str(bootcamp["id"].as_str().unwrap()).unwrap();
        (state, id)
    }

    fn reviewer() -> AuthUser {
        AuthUser { id: Uuid::new_v4(), role: Role::User }
    }

    fn review(rating: i64) -> Value {
        json!({"title": "Solid", "text": "Good mentors", "rating": rating})
    }

    async fn average_rating(state: &AppState, bootcamp_id: Uuid) -> Option<f64> {
        state
            .repository(Collection::Bootcamps)
            .select_404(bootcamp_id)
            .await
            .unwrap()
            .get("averageRating")
            .and_then(Value::as_f64)
    }

    #[tokio::test]
    async fn rating_tracks_reviews_and_clears() {
        let (state, bootcamp_id) = setup().await;
        let service = ReviewService::new(&state);
        let author = reviewer();

        let created = service.create(&author, bootcamp_id, review(7)).await.unwrap();
        assert_eq!(average_rating(&state, bootcamp_id).await, Some(7.0));

        service.create(&reviewer(), bootcamp_id, review(8)).await.unwrap();
        assert_eq!(average_rating(&state, bootcamp_id).await, Some(7.5));

        let id = Uuid::parse_str(created["id"].as_str().unwrap()).unwrap();
        service.update(&author, id, json!({"rating": 10})).await.unwrap();
        assert_eq!(average_rating(&state, bootcamp_id).await, Some(9.0));

        let all = service.list(Some(bootcamp_id), &HashMap::new()).await.unwrap();
        let admin = AuthUser { id: Uuid::new_v4(), role: Role::Admin };
        for record in all.records {
            let id = Uuid::parse_str(record["id"].as_str().unwrap()).unwrap();
            service.delete(&admin, id).await.unwrap();
        }
        assert_eq!(average_rating(&state, bootcamp_id).await, None);
    }

    #[tokio::test]
    async fn second_review_by_same_user_fails() {
        let (state, bootcamp_id) = setup().await;
        let service = ReviewService::new(&state);
        let author = reviewer();
        service.create(&author, bootcamp_id, review(7)).await.unwrap();

        let err = service.create(&author, bootcamp_id, review(2)).await.unwrap_err();
        assert!(matches!(err, ApiError::ValidationFailed(_)));
        assert_eq!(average_rating(&state, bootcamp_id).await, Some(7.0));
    }

    #[tokio::test]
    async fn publishers_cannot_review() {
        let (state, bootcamp_id) = setup().await;
        let publisher = AuthUser { id: Uuid::new_v4(), role: Role::Publisher };
        let err = ReviewService::new(&state)
            .create(&publisher, bootcamp_id, review(7))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn authors_promoted_to_publisher_lose_review_writes() {
        let (state, bootcamp_id) = setup().await;
        let service = ReviewService::new(&state);
        let author = reviewer();
        let created = service.create(&author, bootcamp_id, review(7)).await.unwrap();
        let id = Uuid::parse_str(created["id"].as_str().unwrap()).unwrap();

        let promoted = AuthUser { id: author.id, role: Role::Publisher };
        let err = service.update(&promoted, id, json!({"rating": 9})).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        let err = service.delete(&promoted, id).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert_eq!(average_rating(&state, bootcamp_id).await, Some(7.0));
    }

    #[tokio::test]
    async fn out_of_range_rating_is_rejected() {
        let (state, bootcamp_id) = setup().await;
        let err = ReviewService::new(&state)
            .create(&reviewer(), bootcamp_id, review(11))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationFailed(_)));
    }
}
