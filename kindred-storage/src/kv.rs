//! Key-value store adapter.
//!
//! An in-process key-value store: namespaces of binary values keyed by the
//! string form of an entity identifier. [`KvNamespace`] is the typed handle
//! satisfying the same `{Reader, Writer}` capability set as the document
//! store, so services stay agnostic to which technology backs them. The
//! friend-relation adjacency records live here.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use kindred_core::{EntityIdType, StoreError, StoreResult};

use crate::traits::{BatchFetch, Reader, Writer};

/// Shared key-value store holding all namespaces.
#[derive(Debug, Default)]
pub struct KvStore {
    namespaces: RwLock<HashMap<String, HashMap<String, Vec<u8>>>>,
}

impl KvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in a namespace. Zero for unknown namespaces.
    pub fn namespace_len(&self, name: &str) -> StoreResult<usize> {
        let namespaces = self
            .namespaces
            .read()
            .map_err(|_| StoreError::LockPoisoned)?;
        Ok(namespaces.get(name).map(HashMap::len).unwrap_or(0))
    }
}

/// Typed handle to one namespace of a [`KvStore`].
pub struct KvNamespace<K, V> {
    store: Arc<KvStore>,
    name: String,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> KvNamespace<K, V> {
    pub fn new(store: Arc<KvStore>, name: impl Into<String>) -> Self {
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

impl<K, V> Clone for KvNamespace<K, V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            name: self.name.clone(),
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<K, V> Reader<K, V> for KvNamespace<K, V>
where
    K: EntityIdType,
    V: DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> StoreResult<Option<V>> {
        let namespaces = self
            .store
            .namespaces
            .read()
            .map_err(|_| StoreError::LockPoisoned)?;
        match namespaces
            .get(&self.name)
            .and_then(|ns| ns.get(&key.as_uuid().to_string()))
        {
            Some(bytes) => serde_json::from_slice(bytes)
                .map(Some)
                .map_err(|e| StoreError::Serialization {
                    id: key.as_uuid(),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    async fn get_batch(&self, keys: &[K]) -> StoreResult<BatchFetch<K, V>> {
        let namespaces = self
            .store
            .namespaces
            .read()
            .map_err(|_| StoreError::LockPoisoned)?;
        let namespace = namespaces.get(&self.name);

        let mut batch = BatchFetch::new();
        for key in keys {
            let Some(bytes) = namespace.and_then(|ns| ns.get(&key.as_uuid().to_string())) else {
                continue;
            };
            match serde_json::from_slice(bytes) {
                Ok(value) => {
                    batch.found.insert(*key, value);
                }
                Err(e) => {
                    batch.failed.insert(
                        *key,
                        StoreError::Serialization {
                            id: key.as_uuid(),
                            reason: e.to_string(),
                        },
                    );
                }
            }
        }
        Ok(batch)
    }
}

#[async_trait]
impl<K, V> Writer<K, V> for KvNamespace<K, V>
where
    K: EntityIdType,
    V: Serialize + Send + Sync + 'static,
{
    async fn put(&self, key: K, value: V) -> StoreResult<()> {
        let bytes = serde_json::to_vec(&value).map_err(|e| StoreError::Serialization {
            id: key.as_uuid(),
            reason: e.to_string(),
        })?;
        let mut namespaces = self
            .store
            .namespaces
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;
        namespaces
            .entry(self.name.clone())
            .or_default()
            .insert(key.as_uuid().to_string(), bytes);
        Ok(())
    }

    async fn delete(&self, key: &K) -> StoreResult<bool> {
        let mut namespaces = self
            .store
            .namespaces
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;
        Ok(namespaces
            .get_mut(&self.name)
            .and_then(|ns| ns.remove(&key.as_uuid().to_string()))
            .is_some())
    }
}
