//! Request-scoped batching loader.
//!
//! A [`Loader`] coalesces identifier-keyed lookups issued while resolving
//! one request's query graph. Concurrent loads for the same identifier
//! share a single backend fetch; distinct identifiers arriving within the
//! batching window are collected into one `get_batch` call. Every outcome,
//! including "not found", is memoized for the lifetime of the loader, which
//! is exactly one request: the cache is never shared across requests and is
//! dropped with the loader.
//!
//! The batching window is an explicit, time-boxed boundary. The first key
//! queued on an empty batch schedules a dispatch after
//! [`LoaderConfig::batch_window`]; filling the batch to
//! [`LoaderConfig::max_batch_size`] dispatches immediately, and callers that
//! know a resolution level is fully enqueued can flush early with
//! [`Loader::dispatch`].

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::sync::oneshot;

use kindred_core::{StoreError, StoreResult};

use crate::traits::{BatchFetch, Reader};

/// Outcome of a single load: the value, a cacheable "not found", or the
/// error the backend reported for this identifier.
pub type LoadResult<V> = StoreResult<Option<V>>;

/// Configuration for a [`Loader`].
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// How long the first queued key holds the batch open for others.
    pub batch_window: Duration,
    /// Queue size that triggers an immediate dispatch.
    pub max_batch_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_window: Duration::from_millis(2),
            max_batch_size: 64,
        }
    }
}

impl LoaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the batching window.
    pub fn with_batch_window(mut self, window: Duration) -> Self {
        self.batch_window = window;
        self
    }

    /// Set the queue size that forces a dispatch.
    pub fn with_max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = max.max(1);
        self
    }
}

/// One slot of the request-scoped cache.
enum CacheEntry<V> {
    /// A fetch is in flight; these callers are waiting on its outcome.
    Pending(Vec<oneshot::Sender<LoadResult<V>>>),
    /// The outcome is known and served without touching the backend again.
    Resolved(LoadResult<V>),
}

struct LoaderState<K, V> {
    cache: HashMap<K, CacheEntry<V>>,
    /// Keys queued for the next dispatch. Distinct by construction: a key
    /// is only queued when it has no cache entry yet.
    queue: Vec<K>,
    /// Whether a window timer is already running for the open batch.
    window_open: bool,
}

impl<K, V> LoaderState<K, V> {
    fn new() -> Self {
        Self {
            cache: HashMap::new(),
            queue: Vec::new(),
            window_open: false,
        }
    }
}

enum Waiter<V> {
    Ready(LoadResult<V>),
    Pending(oneshot::Receiver<LoadResult<V>>),
}

/// Request-scoped batching cache over one [`Reader`].
pub struct Loader<K, V> {
    state: Arc<Mutex<LoaderState<K, V>>>,
    reader: Arc<dyn Reader<K, V>>,
    config: LoaderConfig,
}

impl<K, V> Loader<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(reader: Arc<dyn Reader<K, V>>) -> Self {
        Self::with_config(reader, LoaderConfig::default())
    }

    pub fn with_config(reader: Arc<dyn Reader<K, V>>, config: LoaderConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(LoaderState::new())),
            reader,
            config,
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load the record for `key`, batching with other in-window loads.
    ///
    /// The outcome delivered here always corresponds to `key`, never to a
    /// neighbor in the same batch.
    pub async fn load(&self, key: K) -> LoadResult<V> {
        let (waiter, dispatch_now) = {
            let mut state = match self.state.lock() {
                Ok(guard) => guard,
                Err(_) => return Err(StoreError::LockPoisoned),
            };
            match state.cache.get_mut(&key) {
                Some(CacheEntry::Resolved(outcome)) => (Waiter::Ready(outcome.clone()), false),
                Some(CacheEntry::Pending(waiters)) => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    (Waiter::Pending(rx), false)
                }
                None => {
                    let (tx, rx) = oneshot::channel();
                    state.cache.insert(key.clone(), CacheEntry::Pending(vec![tx]));
                    state.queue.push(key);
                    if state.queue.len() >= self.config.max_batch_size {
                        (Waiter::Pending(rx), true)
                    } else {
                        if !state.window_open {
                            state.window_open = true;
                            self.schedule_window();
                        }
                        (Waiter::Pending(rx), false)
                    }
                }
            }
        };

        if dispatch_now {
            self.dispatch().await;
        }

        match waiter {
            Waiter::Ready(outcome) => outcome,
            Waiter::Pending(rx) => rx.await.unwrap_or_else(|_| {
                Err(StoreError::Backend {
                    reason: "batch dispatch abandoned".to_string(),
                })
            }),
        }
    }

    /// Flush the open batch immediately instead of waiting for the window.
    pub async fn dispatch(&self) {
        Self::run_dispatch(Arc::downgrade(&self.state), Arc::clone(&self.reader)).await;
    }

    /// Arm the window timer for the batch that was just opened.
    fn schedule_window(&self) {
        // Weak: if the request is aborted and the loader dropped, the timer
        // task finds nothing to dispatch and the fetch is abandoned.
        let state = Arc::downgrade(&self.state);
        let reader = Arc::clone(&self.reader);
        let window = self.config.batch_window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            Self::run_dispatch(state, reader).await;
        });
    }

    async fn run_dispatch(state: Weak<Mutex<LoaderState<K, V>>>, reader: Arc<dyn Reader<K, V>>) {
        let keys = {
            let Some(state) = state.upgrade() else { return };
            let mut guard = match state.lock() {
                Ok(guard) => guard,
                Err(_) => return,
            };
            guard.window_open = false;
            std::mem::take(&mut guard.queue)
        };
        if keys.is_empty() {
            return;
        }

        // The lock is never held across this await; concurrent loads keep
        // making progress (cache hits, joining other pending entries) while
        // the batch is in flight.
        let fetched = reader.get_batch(&keys).await;

        let Some(state) = state.upgrade() else { return };
        let mut guard = match state.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        match fetched {
            Ok(mut batch) => {
                for key in keys {
                    let outcome = outcome_for(&key, &mut batch);
                    resolve_entry(&mut guard, key, outcome);
                }
            }
            Err(err) => {
                // The backend could not report per-key failures; every
                // caller in this batch observes the same error.
                for key in keys {
                    resolve_entry(&mut guard, key, Err(err.clone()));
                }
            }
        }
    }
}

/// Outcome for one key of a completed batch: found, per-key failure, or a
/// cacheable "not found".
fn outcome_for<K, V>(key: &K, batch: &mut BatchFetch<K, V>) -> LoadResult<V>
where
    K: Eq + Hash,
{
    if let Some(value) = batch.found.remove(key) {
        Ok(Some(value))
    } else if let Some(err) = batch.failed.remove(key) {
        Err(err)
    } else {
        Ok(None)
    }
}

fn resolve_entry<K, V>(state: &mut LoaderState<K, V>, key: K, outcome: LoadResult<V>)
where
    K: Eq + Hash,
    V: Clone,
{
    let previous = state
        .cache
        .insert(key, CacheEntry::Resolved(outcome.clone()));
    if let Some(CacheEntry::Pending(waiters)) = previous {
        for waiter in waiters {
            // A dropped receiver means that caller's future was cancelled;
            // the outcome stays cached for the rest of the request.
            let _ = waiter.send(outcome.clone());
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kindred_core::{EntityIdType, UserId};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Reader that records every batch it is asked for.
    #[derive(Default)]
    struct CountingReader {
        records: HashMap<UserId, String>,
        fail_keys: HashSet<UserId>,
        fail_all: bool,
        calls: AtomicUsize,
        batches: Mutex<Vec<Vec<UserId>>>,
    }

    impl CountingReader {
        fn with_records(records: Vec<(UserId, &str)>) -> Self {
            Self {
                records: records
                    .into_iter()
                    .map(|(k, v)| (k, v.to_string()))
                    .collect(),
                ..Default::default()
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn batches(&self) -> Vec<Vec<UserId>> {
            self.batches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Reader<UserId, String> for CountingReader {
        async fn get(&self, key: &UserId) -> StoreResult<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.records.get(key).cloned())
        }

        async fn get_batch(&self, keys: &[UserId]) -> StoreResult<BatchFetch<UserId, String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.batches.lock().unwrap().push(keys.to_vec());
            if self.fail_all {
                return Err(StoreError::Connection {
                    reason: "backend down".to_string(),
                });
            }
            let mut batch = BatchFetch::new();
            for key in keys {
                if self.fail_keys.contains(key) {
                    batch.failed.insert(
                        *key,
                        StoreError::Backend {
                            reason: "corrupt record".to_string(),
                        },
                    );
                } else if let Some(value) = self.records.get(key) {
                    batch.found.insert(*key, value.clone());
                }
            }
            Ok(batch)
        }
    }

    fn loader_over(reader: Arc<CountingReader>) -> Loader<UserId, String> {
        let reader: Arc<dyn Reader<UserId, String>> = reader;
        Loader::new(reader)
    }

    #[tokio::test]
    async fn test_concurrent_loads_of_same_key_share_one_fetch() {
        let id = UserId::now_v7();
        let reader = Arc::new(CountingReader::with_records(vec![(id, "ada")]));
        let loader = loader_over(Arc::clone(&reader));

        let (a, b, c) = tokio::join!(loader.load(id), loader.load(id), loader.load(id));
        assert_eq!(a.unwrap().as_deref(), Some("ada"));
        assert_eq!(b.unwrap().as_deref(), Some("ada"));
        assert_eq!(c.unwrap().as_deref(), Some("ada"));
        assert_eq!(reader.call_count(), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_in_one_window_form_one_batch() {
        let a = UserId::now_v7();
        let b = UserId::now_v7();
        let c = UserId::now_v7();
        let reader = Arc::new(CountingReader::with_records(vec![
            (a, "ada"),
            (b, "brian"),
            (c, "grace"),
        ]));
        let loader = loader_over(Arc::clone(&reader));

        let (ra, rb, rc) = tokio::join!(loader.load(a), loader.load(b), loader.load(c));
        assert!(ra.is_ok() && rb.is_ok() && rc.is_ok());

        assert_eq!(reader.call_count(), 1);
        let batches = reader.batches();
        assert_eq!(batches.len(), 1);
        let batch: HashSet<_> = batches[0].iter().copied().collect();
        assert_eq!(batch, HashSet::from([a, b, c]));
    }

    #[tokio::test]
    async fn test_resolved_outcome_is_served_from_cache() {
        let id = UserId::now_v7();
        let reader = Arc::new(CountingReader::with_records(vec![(id, "ada")]));
        let loader = loader_over(Arc::clone(&reader));

        assert_eq!(loader.load(id).await.unwrap().as_deref(), Some("ada"));
        assert_eq!(loader.load(id).await.unwrap().as_deref(), Some("ada"));
        assert_eq!(reader.call_count(), 1);
    }

    #[tokio::test]
    async fn test_not_found_is_cached() {
        let reader = Arc::new(CountingReader::default());
        let loader = loader_over(Arc::clone(&reader));
        let missing = UserId::now_v7();

        assert!(loader.load(missing).await.unwrap().is_none());
        assert!(loader.load(missing).await.unwrap().is_none());
        assert_eq!(reader.call_count(), 1);
    }

    #[tokio::test]
    async fn test_partial_failure_only_fails_affected_keys() {
        let good = UserId::now_v7();
        let bad = UserId::now_v7();
        let mut reader = CountingReader::with_records(vec![(good, "ada")]);
        reader.fail_keys.insert(bad);
        let reader = Arc::new(reader);
        let loader = loader_over(Arc::clone(&reader));

        let (rg, rb) = tokio::join!(loader.load(good), loader.load(bad));
        assert_eq!(rg.unwrap().as_deref(), Some("ada"));
        assert!(matches!(rb, Err(StoreError::Backend { .. })));
        assert_eq!(reader.call_count(), 1);
    }

    #[tokio::test]
    async fn test_whole_batch_failure_reaches_every_caller() {
        let a = UserId::now_v7();
        let b = UserId::now_v7();
        let reader = Arc::new(CountingReader {
            fail_all: true,
            ..Default::default()
        });
        let loader = loader_over(Arc::clone(&reader));

        let (ra, rb) = tokio::join!(loader.load(a), loader.load(b));
        assert!(matches!(ra, Err(StoreError::Connection { .. })));
        assert!(matches!(rb, Err(StoreError::Connection { .. })));
        assert_eq!(reader.call_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_explicit_dispatch_flushes_before_window() {
        let id = UserId::now_v7();
        let reader = Arc::new(CountingReader::with_records(vec![(id, "ada")]));
        let dyn_reader: Arc<dyn Reader<UserId, String>> = reader.clone();
        let loader = Arc::new(Loader::with_config(
            dyn_reader,
            LoaderConfig::new().with_batch_window(Duration::from_secs(30)),
        ));

        let task = {
            let loader = Arc::clone(&loader);
            tokio::spawn(async move { loader.load(id).await })
        };
        // Let the load enqueue before flushing.
        tokio::time::sleep(Duration::from_millis(20)).await;
        loader.dispatch().await;

        let outcome = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("dispatch should resolve the pending load")
            .unwrap();
        assert_eq!(outcome.unwrap().as_deref(), Some("ada"));
        assert_eq!(reader.call_count(), 1);
    }

    #[tokio::test]
    async fn test_full_batch_dispatches_without_waiting_for_window() {
        let a = UserId::now_v7();
        let b = UserId::now_v7();
        let reader = Arc::new(CountingReader::with_records(vec![(a, "ada"), (b, "brian")]));
        let dyn_reader: Arc<dyn Reader<UserId, String>> = reader.clone();
        let loader = Loader::with_config(
            dyn_reader,
            LoaderConfig::new()
                .with_batch_window(Duration::from_secs(30))
                .with_max_batch_size(2),
        );

        let loads = async { tokio::join!(loader.load(a), loader.load(b)) };
        let (ra, rb) = tokio::time::timeout(Duration::from_secs(1), loads)
            .await
            .expect("full batch should flush immediately");
        assert_eq!(ra.unwrap().as_deref(), Some("ada"));
        assert_eq!(rb.unwrap().as_deref(), Some("brian"));
        assert_eq!(reader.call_count(), 1);
    }

    #[tokio::test]
    async fn test_loader_caches_are_independent() {
        let id = UserId::now_v7();
        let reader = Arc::new(CountingReader::with_records(vec![(id, "ada")]));
        let first = loader_over(Arc::clone(&reader));
        let second = loader_over(Arc::clone(&reader));

        first.load(id).await.unwrap();
        second.load(id).await.unwrap();
        assert_eq!(reader.call_count(), 2);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Every key of a batch resolves to exactly the outcome the
            /// backend reported for it: found, failed, or not-found.
            #[test]
            fn prop_outcome_partitions_batch(
                found in prop::collection::hash_map(0u32..100, any::<u32>(), 0..20),
                failed_keys in prop::collection::hash_set(100u32..200, 0..10),
                missing in prop::collection::hash_set(200u32..300, 0..10),
            ) {
                let mut batch = BatchFetch::new();
                batch.found = found.clone();
                for key in &failed_keys {
                    batch.failed.insert(*key, StoreError::Backend {
                        reason: "corrupt record".to_string(),
                    });
                }

                for (key, value) in &found {
                    prop_assert_eq!(outcome_for(key, &mut batch), Ok(Some(*value)));
                }
                for key in &failed_keys {
                    prop_assert!(outcome_for(key, &mut batch).is_err());
                }
                for key in &missing {
                    prop_assert_eq!(outcome_for(key, &mut batch), Ok(None));
                }
            }
        }
    }
}
