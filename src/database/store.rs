use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::filter::Filter;

/// A stored record: a JSON object carrying its own `id` and `createdAt`.
pub type Document = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Bootcamps,
    Courses,
    Reviews,
    Users,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Bootcamps,
        Collection::Courses,
        Collection::Reviews,
        Collection::Users,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            Collection::Bootcamps => "bootcamps",
            Collection::Courses => "courses",
            Collection::Reviews => "reviews",
            Collection::Users => "users",
        }
    }

    /// Field groups whose combined values must be unique within the collection.
    pub fn unique_keys(&self) -> &'static [&'static [&'static str]] {
        match self {
            Collection::Bootcamps => &[&["name"]],
            Collection::Users => &[&["email"]],
            Collection::Reviews => &[&["bootcamp", "user"]],
            Collection::Courses => &[],
        }
    }

    /// Singular label used in client-facing messages.
    pub fn label(&self) -> &'static str {
        match self {
            Collection::Bootcamps => "Bootcamp",
            Collection::Courses => "Course",
            Collection::Reviews => "Review",
            Collection::Users => "User",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table_name())
    }
}

/// Document persistence behind every service.
///
/// `update_by_id` merges `changes` into the stored document; a `null` value
/// removes that key. Writes never run business rules: aggregate upkeep and
/// authorization belong to the callers.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, DatabaseError>;

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, DatabaseError>;

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, DatabaseError>;

    async fn create(&self, collection: Collection, document: Document) -> Result<Document, DatabaseError>;

    async fn update_by_id(
        &self,
        collection: Collection,
        id: Uuid,
        changes: Document,
    ) -> Result<Document, DatabaseError>;

    /// Returns false when nothing had that id.
    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> Result<bool, DatabaseError>;

    async fn delete_all(&self, collection: Collection) -> Result<u64, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;

    /// Short backend name for logs and the health endpoint.
    fn backend(&self) -> &'static str;
}

/// Assign `id` and `createdAt` unless the document already carries valid ones.
pub fn prepare_insert(mut document: Document) -> Result<(Uuid, Document), DatabaseError> {
    let id = match document.get("id") {
        Some(Value::String(raw)) => {
            Uuid::parse_str(raw).map_err(|_| DatabaseError::QueryError(format!("invalid id '{}'", raw)))?
        }
        Some(Value::Null) | None => Uuid::new_v4(),
        Some(other) => return Err(DatabaseError::QueryError(format!("invalid id {}", other))),
    };
    document.insert("id".to_string(), Value::String(id.to_string()));
    if !matches!(document.get("createdAt"), Some(Value::String(_))) {
        document.insert("createdAt".to_string(), Value::String(timestamp_now()));
    }
    Ok((id, document))
}

/// Fixed-width RFC 3339 so lexical and chronological order agree.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Merge `changes` into `document`, removing keys whose new value is null.
/// `id` and `createdAt` are never touched.
pub fn merge_changes(document: &mut Document, changes: Document) {
    for (key, value) in changes {
        if key == "id" || key == "createdAt" {
            continue;
        }
        if value.is_null() {
            document.remove(&key);
        } else {
            document.insert(key, value);
        }
    }
}

pub fn document_id(document: &Document) -> Option<Uuid> {
    document.get("id").and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn insert_assigns_identity_and_timestamp() {
        let (id, d) = prepare_insert(doc(json!({"name": "Devworks"}))).unwrap();
        assert_eq!(d["id"], json!(id.to_string()));
        assert!(d["createdAt"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn insert_keeps_supplied_uuid() {
        let id = Uuid::new_v4();
        let (assigned, _) = prepare_insert(doc(json!({"id": id.to_string()}))).unwrap();
        assert_eq!(assigned, id);
        assert!(prepare_insert(doc(json!({"id": "5d713995b721c3bb38c1f5d0"}))).is_err());
    }

    #[test]
    fn merge_removes_nulls_and_protects_identity() {
        let mut d = doc(json!({"id": "a", "createdAt": "t", "averageCost": 10, "name": "x"}));
        merge_changes(&mut d, doc(json!({"id": "b", "averageCost": null, "name": "y"})));
        assert_eq!(Value::Object(d), json!({"id": "a", "createdAt": "t", "name": "y"}));
    }
}
