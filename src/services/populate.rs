use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::database::manager::DatabaseError;
use crate::database::store::{document_id, Collection, Document, RecordStore};
use crate::filter::filter::project_fields;
use crate::filter::Filter;

/// Inline expansion of a relation, requested by the route rather than the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Populate {
    /// Replace the id stored in `field` with the referenced record.
    Reference {
        field: &'static str,
        collection: Collection,
        select: Option<&'static [&'static str]>,
    },
    /// Add a virtual `field` listing the records whose `relation` points back here.
    Children {
        field: &'static str,
        collection: Collection,
        relation: &'static str,
        select: Option<&'static [&'static str]>,
    },
}

impl Populate {
    /// `bootcamp` on courses and reviews, limited to name and description.
    pub const BOOTCAMP_SUMMARY: Populate = Populate::Reference {
        field: "bootcamp",
        collection: Collection::Bootcamps,
        select: Some(&["name", "description"]),
    };

    /// Virtual `courses` on bootcamps.
    pub const BOOTCAMP_COURSES: Populate = Populate::Children {
        field: "courses",
        collection: Collection::Courses,
        relation: "bootcamp",
        select: None,
    };

    pub fn field(&self) -> &'static str {
        match *self {
            Populate::Reference { field, .. } | Populate::Children { field, .. } => field,
        }
    }

    /// False when a `select` projection leaves the populated field out.
    pub fn wanted_by(&self, filter: &Filter) -> bool {
        filter
            .selected()
            .map_or(true, |columns| columns.iter().any(|c| c == self.field()))
    }

    pub async fn apply(&self, store: &Arc<dyn RecordStore>, documents: &mut [Document]) -> Result<(), DatabaseError> {
        match *self {
            Populate::Reference { field, collection, select } => {
                let ids: Vec<Value> = documents
                    .iter()
                    .filter_map(|d| d.get(field).and_then(Value::as_str))
                    .map(|id| Value::String(id.to_string()))
                    .collect();
                if ids.is_empty() {
                    return Ok(());
                }

                let related: HashMap<String, Document> = store
                    .find(collection, &Filter::new().where_in("id", ids))
                    .await?
                    .into_iter()
                    .filter_map(|d| document_id(&d).map(|id| (id.to_string(), restrict(d, select))))
                    .collect();

                for document in documents.iter_mut() {
                    let target = document
                        .get(field)
                        .and_then(Value::as_str)
                        .and_then(|id| related.get(id))
                        .cloned();
                    if let Some(target) = target {
                        document.insert(field.to_string(), Value::Object(target));
                    }
                }
            }
            Populate::Children { field, collection, relation, select } => {
                let ids: Vec<Value> = documents
                    .iter()
                    .filter_map(document_id)
                    .map(|id| Value::String(id.to_string()))
                    .collect();
                if ids.is_empty() {
                    return Ok(());
                }

                let mut grouped: HashMap<String, Vec<Value>> = HashMap::new();
                let mut filter = Filter::new().where_in(relation, ids);
                filter.order("createdAt").map_err(DatabaseError::from)?;
                for child in store.find(collection, &filter).await? {
                    if let Some(parent) = child.get(relation).and_then(Value::as_str).map(str::to_string) {
                        grouped.entry(parent).or_default().push(Value::Object(restrict(child, select)));
                    }
                }

                for document in documents.iter_mut() {
                    if let Some(id) = document_id(document) {
                        let children = grouped.remove(&id.to_string()).unwrap_or_default();
                        document.insert(field.to_string(), Value::Array(children));
                    }
                }
            }
        }
        Ok(())
    }
}

fn restrict(document: Document, select: Option<&[&str]>) -> Document {
    match select {
        Some(columns) => project_fields(document, columns),
        None => document,
    }
}
