use futures::future::try_join_all;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::aggregate::AggregateRule;
use crate::database::models::bootcamp::slugify;
use crate::database::models::user::validate_password;
use crate::database::models::{Bootcamp, Course, Model, Review, User};
use crate::database::store::{document_id, Collection, Document};
use crate::database::DatabaseError;
use crate::filter::Filter;
use crate::server::AppState;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{file} entry {index}: {message}")]
    Invalid {
        file: &'static str,
        index: usize,
        message: String,
    },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Dependency order: owners before what they own.
const IMPORT_ORDER: [(Collection, &str); 4] = [
    (Collection::Users, "users.json"),
    (Collection::Bootcamps, "bootcamps.json"),
    (Collection::Courses, "courses.json"),
    (Collection::Reviews, "reviews.json"),
];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub imported: Vec<(Collection, usize)>,
    pub bootcamps_recomputed: usize,
}

/// Bulk loading and wiping of a store from JSON fixture files.
pub struct SeedService {
    state: AppState,
}

impl SeedService {
    pub fn new(state: &AppState) -> Self {
        Self { state: state.clone() }
    }

    /// Load every fixture file present in `dir`, then recompute all aggregates.
    pub async fn import(&self, dir: &Path) -> Result<SeedReport, SeedError> {
        let mut report = SeedReport::default();

        for (collection, file) in IMPORT_ORDER {
            let path = dir.join(file);
            if !path.exists() {
                warn!("Skipping {}, file not found", path.display());
                continue;
            }
            let entries = read_entries(&path)?;
            let mut count = 0;
            for (index, entry) in entries.into_iter().enumerate() {
                let document = self
                    .prepare(collection, entry)
                    .await
                    .map_err(|message| SeedError::Invalid { file, index, message })?;
                self.state.store.create(collection, document).await?;
                count += 1;
            }
            info!("Imported {} {}", count, collection);
            report.imported.push((collection, count));
        }

        let maintainer = self.state.aggregates();
        let bootcamps = self.state.store.find(Collection::Bootcamps, &Filter::new()).await?;
        for bootcamp in &bootcamps {
            if let Some(id) = document_id(bootcamp) {
                try_join_all(AggregateRule::ALL.iter().map(|rule| maintainer.recompute(rule, id))).await?;
                report.bootcamps_recomputed += 1;
            }
        }
        Ok(report)
    }

    /// Remove every record of every collection.
    pub async fn destroy(&self) -> Result<u64, SeedError> {
        let mut removed = 0;
        for collection in Collection::ALL {
            let count = self.state.store.delete_all(collection).await?;
            info!("Deleted {} {}", count, collection);
            removed += count;
        }
        Ok(removed)
    }

    /// Validate one fixture entry and fill what the API would have derived.
    async fn prepare(&self, collection: Collection, entry: Value) -> Result<Document, String> {
        let Value::Object(mut document) = entry else {
            return Err("expected a JSON object".to_string());
        };

        let canonical = match collection {
            Collection::Users => {
                let plain = document
                    .get("password")
                    .and_then(Value::as_str)
                    .ok_or("missing password")?
                    .to_string();
                validate_password(&plain).map_err(|e| e.to_string())?;
                let hashed = self.state.hasher.hash(&plain).map_err(|e| e.to_string())?;
                document.insert("password".to_string(), Value::String(hashed));
                User::from_document(&document).and_then(|m| m.to_document())
            }
            Collection::Bootcamps => {
                if let Some(slug) = document.get("name").and_then(Value::as_str).map(slugify) {
                    document.insert("slug".to_string(), Value::String(slug));
                }
                document.remove("averageCost");
                document.remove("averageRating");
                if !document.contains_key("location") {
                    if let Some(address) = document.get("address").and_then(Value::as_str) {
                        match self.state.geocoder.geocode(address).await {
                            Ok(Some(location)) => {
                                let location = serde_json::to_value(location).map_err(|e| e.to_string())?;
                                document.insert("location".to_string(), location);
                            }
                            Ok(None) => {}
                            Err(e) => warn!("Geocoding '{}' failed: {}", address, e),
                        }
                    }
                }
                Bootcamp::from_document(&document).and_then(|m| m.to_document())
            }
            Collection::Courses => Course::from_document(&document).and_then(|m| m.to_document()),
            Collection::Reviews => Review::from_document(&document).and_then(|m| m.to_document()),
        };
        canonical.map_err(|e| e.to_string())
    }
}

fn read_entries(path: &Path) -> Result<Vec<Value>, SeedError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| SeedError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
