// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory document store for local development and tests.
//!
//! Documents are kept as JSON values so they round-trip through serde the
//! same way they would through Firestore. A document's map shard lock is
//! held for the whole of `update`, which makes each single-document
//! read-modify-write atomic.

use crate::error::AppError;
use dashmap::{DashMap, DashSet};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;

type DocKey = (String, String);

fn key(collection: &str, id: &str) -> DocKey {
    (collection.to_string(), id.to_string())
}

fn decode<T: DeserializeOwned>(value: &Value) -> Result<T, AppError> {
    serde_json::from_value(value.clone())
        .map_err(|e| AppError::Database(format!("Corrupt document: {}", e)))
}

fn encode<T: Serialize>(doc: &T) -> Result<Value, AppError> {
    serde_json::to_value(doc).map_err(|e| AppError::Database(format!("Encode failed: {}", e)))
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    documents: Arc<DashMap<DocKey, Value>>,
    failing: Arc<DashSet<DocKey>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write to one document fail with a database
    /// error. Used to exercise partially-applied fan-outs.
    pub fn fail_writes_to(&self, collection: &str, id: &str) {
        self.failing.insert(key(collection, id));
    }

    fn check_writable(&self, k: &DocKey) -> Result<(), AppError> {
        if self.failing.contains(k) {
            return Err(AppError::Database(format!(
                "Write to {}/{} rejected",
                k.0, k.1
            )));
        }
        Ok(())
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>, AppError> {
        self.documents
            .get(&key(collection, id))
            .map(|doc| decode(doc.value()))
            .transpose()
    }

    pub async fn find_by_field<T: DeserializeOwned>(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<T>, AppError> {
        let mut matches: Vec<(String, Value)> = self
            .documents
            .iter()
            .filter(|entry| entry.key().0 == collection)
            .filter(|entry| entry.value().get(field).and_then(Value::as_str) == Some(value))
            .map(|entry| (entry.key().1.clone(), entry.value().clone()))
            .collect();
        matches.sort_by(|a, b| a.0.cmp(&b.0));

        matches.iter().map(|(_, doc)| decode(doc)).collect()
    }

    pub async fn insert<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        doc: &T,
    ) -> Result<(), AppError> {
        let k = key(collection, id);
        self.check_writable(&k)?;
        let value = encode(doc)?;
        match self.documents.entry(k) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(AppError::Database(format!(
                "Document {}/{} already exists",
                collection, id
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }

    pub async fn set<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        doc: &T,
    ) -> Result<(), AppError> {
        let k = key(collection, id);
        self.check_writable(&k)?;
        self.documents.insert(k, encode(doc)?);
        Ok(())
    }

    pub async fn update<T, F>(
        &self,
        collection: &str,
        id: &str,
        mutate: F,
    ) -> Result<Option<T>, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T) -> Result<(), AppError>,
    {
        let k = key(collection, id);
        let Some(mut entry) = self.documents.get_mut(&k) else {
            return Ok(None);
        };
        self.check_writable(&k)?;

        let mut doc: T = decode(entry.value())?;
        mutate(&mut doc)?;
        *entry.value_mut() = encode(&doc)?;
        Ok(Some(doc))
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        let k = key(collection, id);
        self.check_writable(&k)?;
        self.documents.remove(&k);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Doc {
        name: String,
        count: u32,
    }

    fn doc(name: &str, count: u32) -> Doc {
        Doc {
            name: name.to_string(),
            count,
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_existing_id() {
        let store = MemoryStore::new();
        store.insert("docs", "1", &doc("a", 0)).await.unwrap();

        let err = store.insert("docs", "1", &doc("b", 0)).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));

        let stored: Doc = store.get("docs", "1").await.unwrap().unwrap();
        assert_eq!(stored.name, "a");
    }

    #[tokio::test]
    async fn test_update_missing_returns_none() {
        let store = MemoryStore::new();
        let result: Option<Doc> = store
            .update("docs", "nope", |d: &mut Doc| {
                d.count += 1;
                Ok(())
            })
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_update_error_leaves_document_unchanged() {
        let store = MemoryStore::new();
        store.insert("docs", "1", &doc("a", 1)).await.unwrap();

        let err = store
            .update("docs", "1", |d: &mut Doc| {
                d.count = 99;
                Err(AppError::Conflict("no".to_string()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let stored: Doc = store.get("docs", "1").await.unwrap().unwrap();
        assert_eq!(stored.count, 1);
    }

    #[tokio::test]
    async fn test_find_by_field_is_scoped_to_collection() {
        let store = MemoryStore::new();
        store.insert("docs", "2", &doc("x", 0)).await.unwrap();
        store.insert("docs", "1", &doc("x", 1)).await.unwrap();
        store.insert("other", "3", &doc("x", 2)).await.unwrap();

        let found: Vec<Doc> = store.find_by_field("docs", "name", "x").await.unwrap();
        assert_eq!(found, vec![doc("x", 1), doc("x", 0)]);
    }

    #[tokio::test]
    async fn test_failing_document_rejects_writes() {
        let store = MemoryStore::new();
        store.insert("docs", "1", &doc("a", 0)).await.unwrap();
        store.fail_writes_to("docs", "1");

        assert!(store.set("docs", "1", &doc("b", 0)).await.is_err());
        assert!(store.delete("docs", "1").await.is_err());
        let stored: Doc = store.get("docs", "1").await.unwrap().unwrap();
        assert_eq!(stored.name, "a");
    }
}
