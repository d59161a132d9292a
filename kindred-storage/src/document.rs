//! Document store adapter.
//!
//! An in-process document store: named collections of JSON documents keyed
//! by UUID. [`DocumentCollection`] is the typed handle that satisfies the
//! `{Reader, Writer}` capability set for one collection; records go through
//! serde on the way in and out, the same way they would against an external
//! document database.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use kindred_core::{EntityIdType, StoreError, StoreResult};

use crate::traits::{BatchFetch, Reader, Writer};

/// Shared document store holding all collections.
#[derive(Debug, Default)]
pub struct DocumentStore {
    collections: RwLock<HashMap<String, HashMap<Uuid, JsonValue>>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection. Zero for unknown collections.
    pub fn collection_len(&self, name: &str) -> StoreResult<usize> {
        let collections = self
            .collections
            .read()
            .map_err(|_| StoreError::LockPoisoned)?;
        Ok(collections.get(name).map(HashMap::len).unwrap_or(0))
    }
}

/// Typed handle to one collection of a [`DocumentStore`].
pub struct DocumentCollection<K, V> {
    store: Arc<DocumentStore>,
    name: String,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> DocumentCollection<K, V> {
    pub fn new(store: Arc<DocumentStore>, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<K, V> Clone for DocumentCollection<K, V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            name: self.name.clone(),
            _marker: PhantomData,
        }
    }
}

fn decode<V: DeserializeOwned>(id: Uuid, doc: &JsonValue) -> StoreResult<V> {
    serde_json::from_value(doc.clone()).map_err(|e| StoreError::Serialization {
        id,
        reason: e.to_string(),
    })
}

#[async_trait]
impl<K, V> Reader<K, V> for DocumentCollection<K, V>
where
    K: EntityIdType,
    V: DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> StoreResult<Option<V>> {
        let collections = self
            .store
            .collections
            .read()
            .map_err(|_| StoreError::LockPoisoned)?;
        match collections.get(&self.name).and_then(|c| c.get(&key.as_uuid())) {
            Some(doc) => decode(key.as_uuid(), doc).map(Some),
            None => Ok(None),
        }
    }

    async fn get_batch(&self, keys: &[K]) -> StoreResult<BatchFetch<K, V>> {
        let collections = self
            .store
            .collections
            .read()
            .map_err(|_| StoreError::LockPoisoned)?;
        let collection = collections.get(&self.name);

        let mut batch = BatchFetch::new();
        for key in keys {
            let Some(doc) = collection.and_then(|c| c.get(&key.as_uuid())) else {
                continue;
            };
            match decode(key.as_uuid(), doc) {
                Ok(value) => {
                    batch.found.insert(*key, value);
                }
                Err(err) => {
                    batch.failed.insert(*key, err);
                }
            }
        }
        Ok(batch)
    }
}

#[async_trait]
impl<K, V> Writer<K, V> for DocumentCollection<K, V>
where
    K: EntityIdType,
    V: Serialize + Send + Sync + 'static,
{
    async fn put(&self, key: K, value: V) -> StoreResult<()> {
        let doc = serde_json::to_value(&value).map_err(|e| StoreError::Serialization {
            id: key.as_uuid(),
            reason: e.to_string(),
        })?;
        let mut collections = self
            .store
            .collections
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;
        collections
            .entry(self.name.clone())
            .or_default()
            .insert(key.as_uuid(), doc);
        Ok(())
    }

    async fn delete(&self, key: &K) -> StoreResult<bool> {
        let mut collections = self
            .store
            .collections
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;
        Ok(collections
            .get_mut(&self.name)
            .and_then(|c| c.remove(&key.as_uuid()))
            .is_some())
    }
}
