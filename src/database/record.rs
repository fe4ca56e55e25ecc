use serde_json::{Map, Value};
use std::collections::HashSet;
use crate::database::store::Document;

/// Fields only the server may write.
pub const SYSTEM_FIELDS: &[&str] = &["id", "createdAt"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("Expected a JSON object")]
    NotAnObject,
}

/// A stored document with change tracking against the version it was loaded as.
#[derive(Debug, Clone)]
pub struct Record {
    original: Option<Document>,
    fields: Document,
    modified_fields: HashSet<String>,
}

impl Record {
    /// Start a new record from client input, discarding system and `protected` fields.
    pub fn from_input(input: Value, protected: &[&str]) -> Result<Self, RecordError> {
        let Value::Object(map) = input else {
            return Err(RecordError::NotAnObject);
        };
        let fields = strip_fields(map, protected);
        Ok(Self {
            original: None,
            fields,
            modified_fields: HashSet::new(),
        })
    }

    /// Wrap a document loaded from the store.
    pub fn from_stored(document: Document) -> Self {
        Self {
            original: Some(document.clone()),
            fields: document,
            modified_fields: HashSet::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let key = key.into();
        if self.original.is_some() {
            self.modified_fields.insert(key.clone());
        }
        self.fields.insert(key, value.into());
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        if self.original.is_some() {
            self.modified_fields.insert(key.to_string());
        }
        self.fields.remove(key)
    }

    /// Apply client changes, discarding system and `protected` fields.
    pub fn apply_input(&mut self, input: Value, protected: &[&str]) -> Result<&mut Self, RecordError> {
        let Value::Object(map) = input else {
            return Err(RecordError::NotAnObject);
        };
        for (key, value) in strip_fields(map, protected) {
            if value.is_null() {
                self.remove(&key);
            } else {
                self.set(key, value);
            }
        }
        Ok(self)
    }

    /// Make the fields equal `canonical`, tracking every key that moves.
    pub fn normalize(&mut self, canonical: Document) -> &mut Self {
        let stale: Vec<String> = self
            .fields
            .keys()
            .filter(|key| !canonical.contains_key(*key))
            .cloned()
            .collect();
        for key in stale {
            self.remove(&key);
        }
        for (key, value) in canonical {
            if self.fields.get(&key) != Some(&value) {
                self.set(key, value);
            }
        }
        self
    }

    /// True when `key` differs from the loaded version (always true for new fields on create).
    pub fn changed(&self, key: &str) -> bool {
        match &self.original {
            Some(original) => original.get(key) != self.fields.get(key),
            None => self.fields.contains_key(key),
        }
    }

    /// The change set for a store update: new values, with `null` for removed keys.
    pub fn changes(&self) -> Document {
        let mut changes = Map::new();
        for key in &self.modified_fields {
            if !self.changed(key) {
                continue;
            }
            let value = self.fields.get(key).cloned().unwrap_or(Value::Null);
            changes.insert(key.clone(), value);
        }
        changes
    }

    pub fn has_changes(&self) -> bool {
        self.original.is_none() || !self.changes().is_empty()
    }

    pub fn fields(&self) -> &Document {
        &self.fields
    }

    pub fn into_document(self) -> Document {
        self.fields
    }
}

fn strip_fields(map: Document, protected: &[&str]) -> Document {
    map.into_iter()
        .filter(|(key, _)| !SYSTEM_FIELDS.contains(&key.as_str()) && !protected.contains(&key.as_str()))
        .collect()
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Object(record.fields)
    }
}
