use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::store::{document_id, merge_changes, prepare_insert, Collection, Document, RecordStore};
use crate::filter::filter_order::FilterOrder;
use crate::filter::Filter;

/// In-process store evaluating filters directly against JSON documents.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_unique(
        collection: Collection,
        existing: &[Document],
        candidate: &Document,
        skip: Option<Uuid>,
    ) -> Result<(), DatabaseError> {
        for fields in collection.unique_keys() {
            let key: Option<Vec<&Value>> = fields.iter().map(|f| candidate.get(*f)).collect();
            let Some(key) = key else { continue };

            let clash = existing.iter().any(|other| {
                skip.map_or(true, |id| document_id(other) != Some(id))
                    && fields
                        .iter()
                        .zip(&key)
                        .all(|(field, value)| other.get(*field) == Some(*value))
            });
            if clash {
                return Err(DatabaseError::Duplicate(fields.join(",")));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, DatabaseError> {
        let guard = self.collections.read().await;
        let mut matched: Vec<Document> = guard
            .get(&collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default();
        drop(guard);

        FilterOrder::sort(&mut matched, filter.order_info());

        let windowed: Vec<Document> = match filter.page_window() {
            Some(window) => matched
                .into_iter()
                .skip(window.skip() as usize)
                .take(window.limit as usize)
                .collect(),
            None => matched,
        };

        Ok(windowed.into_iter().map(|d| filter.project(d)).collect())
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, DatabaseError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(&collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).count() as u64)
            .unwrap_or(0))
    }

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, DatabaseError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| document_id(d) == Some(id)))
            .cloned())
    }

    async fn create(&self, collection: Collection, document: Document) -> Result<Document, DatabaseError> {
        let (id, document) = prepare_insert(document)?;
        let mut guard = self.collections.write().await;
        let docs = guard.entry(collection).or_default();

        if docs.iter().any(|d| document_id(d) == Some(id)) {
            return Err(DatabaseError::Duplicate("id".to_string()));
        }
        Self::check_unique(collection, docs, &document, None)?;

        docs.push(document.clone());
        Ok(document)
    }

    async fn update_by_id(
        &self,
        collection: Collection,
        id: Uuid,
        changes: Document,
    ) -> Result<Document, DatabaseError> {
        let mut guard = self.collections.write().await;
        let docs = guard.entry(collection).or_default();
        let position = docs
            .iter()
            .position(|d| document_id(d) == Some(id))
            .ok_or_else(|| DatabaseError::NotFound(format!("{} {}", collection.label(), id)))?;

        let mut updated = docs[position].clone();
        merge_changes(&mut updated, changes);
        Self::check_unique(collection, docs, &updated, Some(id))?;

        docs[position] = updated.clone();
        Ok(updated)
    }

    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> Result<bool, DatabaseError> {
        let mut guard = self.collections.write().await;
        let Some(docs) = guard.get_mut(&collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| document_id(d) != Some(id));
        Ok(docs.len() != before)
    }

    async fn delete_all(&self, collection: Collection) -> Result<u64, DatabaseError> {
        let mut guard = self.collections.write().await;
        Ok(guard.remove(&collection).map(|docs| docs.len() as u64).unwrap_or(0))
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
