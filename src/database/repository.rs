use std::sync::Arc;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::store::{Collection, Document, RecordStore};
use crate::filter::Filter;

/// One collection of a [`RecordStore`], with not-found handling folded in.
#[derive(Clone)]
pub struct Repository {
    collection: Collection,
    store: Arc<dyn RecordStore>,
}

impl Repository {
    pub fn new(collection: Collection, store: Arc<dyn RecordStore>) -> Self {
        Self { collection, store }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub async fn select_any(&self, filter: &Filter) -> Result<Vec<Document>, DatabaseError> {
        self.store.find(self.collection, filter).await
    }

    pub async fn select_one(&self, filter: &Filter) -> Result<Option<Document>, DatabaseError> {
        let mut found = self.store.find(self.collection, filter).await?;
        Ok(if found.is_empty() { None } else { Some(found.swap_remove(0)) })
    }

    pub async fn select_by_id(&self, id: Uuid) -> Result<Option<Document>, DatabaseError> {
        self.store.find_by_id(self.collection, id).await
    }

    pub async fn select_404(&self, id: Uuid) -> Result<Document, DatabaseError> {
        self.store
            .find_by_id(self.collection, id)
            .await?
            .ok_or_else(|| self.not_found(id))
    }

    pub async fn count(&self, filter: &Filter) -> Result<u64, DatabaseError> {
        self.store.count(self.collection, filter).await
    }

    pub async fn create(&self, document: Document) -> Result<Document, DatabaseError> {
        self.store.create(self.collection, document).await
    }

    pub async fn update_404(&self, id: Uuid, changes: Document) -> Result<Document, DatabaseError> {
        self.store.update_by_id(self.collection, id, changes).await
    }

    pub async fn delete_404(&self, id: Uuid) -> Result<(), DatabaseError> {
        if self.store.delete_by_id(self.collection, id).await? {
            Ok(())
        } else {
            Err(self.not_found(id))
        }
    }

    /// Delete every record matching `filter`, returning how many went.
    pub async fn delete_matching(&self, filter: &Filter) -> Result<u64, DatabaseError> {
        let mut deleted = 0;
        for document in self.select_any(filter).await? {
            if let Some(id) = crate::database::store::document_id(&document) {
                if self.store.delete_by_id(self.collection, id).await? {
                    deleted += 1;
                }
            }
        }
        Ok(deleted)
    }

    fn not_found(&self, id: Uuid) -> DatabaseError {
        DatabaseError::NotFound(format!("{} not found with id of {}", self.collection.label(), id))
    }
}
