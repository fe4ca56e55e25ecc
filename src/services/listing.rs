use crate::database::manager::DatabaseError;
use crate::database::repository::Repository;
use crate::database::store::Document;
use crate::filter::{Filter, Pagination};

/// One page of a list endpoint plus what the envelope needs to describe it.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub records: Vec<Document>,
    /// Matches ignoring the page window.
    pub total: u64,
    pub pagination: Pagination,
}

impl Listing {
    pub async fn fetch(repository: &Repository, filter: &Filter) -> Result<Self, DatabaseError> {
        let records = repository.select_any(filter).await?;
        let total = repository.count(filter).await?;
        Ok(Self {
            records,
            total,
            pagination: filter.pagination(total),
        })
    }

    pub fn map_records(mut self, f: impl FnMut(Document) -> Document) -> Self {
        self.records = self.records.into_iter().map(f).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;
    use crate::database::memory::MemoryStore;
    use crate::database::store::{Collection, RecordStore};
    use crate::filter::PageLink;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    async fn seeded(n: usize) -> Repository {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        for i in 0..n {
            let doc = json!({"title": format!("course {i}"), "weeks": i}).as_object().cloned().unwrap();
            store.create(Collection::Courses, doc).await.unwrap();
        }
        Repository::new(Collection::Courses, store)
    }

    fn page(n: &str) -> Filter {
        let params: HashMap<String, String> =
            [("page", n), ("limit", "20")].iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Filter::from_query(&params, &FilterConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn pages_of_forty_five() {
        let repository = seeded(45).await;

        let first = Listing::fetch(&repository, &page("1")).await.unwrap();
        assert_eq!(first.records.len(), 20);
        assert_eq!(first.total, 45);
        assert_eq!(first.pagination.next, Some(PageLink { page: 2, limit: 20 }));
        assert_eq!(first.pagination.prev, None);

        let second = Listing::fetch(&repository, &page("2")).await.unwrap();
        assert_eq!(second.records.len(), 20);
        assert_eq!(second.pagination.next, Some(PageLink { page: 3, limit: 20 }));
        assert_eq!(second.pagination.prev, Some(PageLink { page: 1, limit: 20 }));

        let third = Listing::fetch(&repository, &page("3")).await.unwrap();
        assert_eq!(third.records.len(), 5);
        assert_eq!(third.pagination.next, None);
        assert_eq!(third.pagination.prev, Some(PageLink { page: 2, limit: 20 }));
    }

    #[tokio::test]
    async fn empty_collection_has_no_links() {
        let repository = seeded(0).await;
        let listing = Listing::fetch(&repository, &page("1")).await.unwrap();
        assert!(listing.records.is_empty());
        assert_eq!(listing.pagination, Pagination::default());
    }
}
