//! Storage capability traits.
//!
//! A store adapter satisfies the `{Reader, Writer}` capability set for one
//! key/value pairing. Services and the loader depend only on these traits,
//! never on a concrete storage technology: the document store and the
//! key-value store both implement them interchangeably.

use std::collections::HashMap;
use std::hash::Hash;

use async_trait::async_trait;
use kindred_core::{StoreError, StoreResult};

/// Result of a batched lookup.
///
/// Keys absent from both maps were not found in the backend. `failed`
/// carries per-key errors so that a partially failing batch only fails the
/// callers waiting on the affected identifiers.
#[derive(Debug, Clone)]
pub struct BatchFetch<K, V> {
    pub found: HashMap<K, V>,
    pub failed: HashMap<K, StoreError>,
}

impl<K: Eq + Hash, V> BatchFetch<K, V> {
    /// An empty batch result.
    pub fn new() -> Self {
        Self {
            found: HashMap::new(),
            failed: HashMap::new(),
        }
    }

    /// Total number of keys accounted for (found or failed).
    pub fn len(&self) -> usize {
        self.found.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.found.is_empty() && self.failed.is_empty()
    }
}

impl<K: Eq + Hash, V> Default for BatchFetch<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Read capability over one record family.
///
/// The batched form is what the loader depends on: one `get_batch` call per
/// dispatch window instead of one `get` per identifier.
#[async_trait]
pub trait Reader<K, V>: Send + Sync {
    /// Point lookup. A missing record is `Ok(None)`, not an error.
    async fn get(&self, key: &K) -> StoreResult<Option<V>>;

    /// Batched lookup over a set of distinct keys.
    async fn get_batch(&self, keys: &[K]) -> StoreResult<BatchFetch<K, V>>;
}

/// Write capability over one record family.
///
/// Each operation succeeds or fails atomically for its single record; no
/// multi-record transaction is guaranteed or assumed.
#[async_trait]
pub trait Writer<K, V>: Send + Sync {
    /// Create or replace the record stored under `key`.
    async fn put(&self, key: K, value: V) -> StoreResult<()>;

    /// Delete the record stored under `key`. Returns whether it existed.
    async fn delete(&self, key: &K) -> StoreResult<bool>;
}
