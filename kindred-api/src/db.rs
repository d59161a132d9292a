//! Database Handle Module
//!
//! The [`Database`] is the process-wide composite handle over the two
//! backing stores: a document store for user and credential records and a
//! key-value store for friend adjacency records. It is constructed once at
//! startup and injected explicitly into the router builder.
//!
//! Each request gets its own [`DbSession`] from the db-session middleware;
//! acquisition fails closed with a connection error once the database has
//! been shut down, which the middleware surfaces as a 503.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use kindred_core::{Credential, FriendSet, StoreError, StoreResult, User, UserId};
use kindred_storage::{DocumentCollection, DocumentStore, KvNamespace, KvStore, Reader};

/// Collection holding user profile documents.
const USERS_COLLECTION: &str = "users";
/// Collection holding credential documents, keyed by user.
const CREDENTIALS_COLLECTION: &str = "credentials";
/// Namespace holding friend adjacency records, keyed by user.
const FRIENDS_NAMESPACE: &str = "friends";

/// Process-wide database handle.
#[derive(Clone)]
pub struct Database {
    documents: Arc<DocumentStore>,
    kv: Arc<KvStore>,
    available: Arc<AtomicBool>,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(DocumentStore::new()),
            kv: Arc::new(KvStore::new()),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Whether sessions can currently be opened.
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    /// Shut the database down; subsequent sessions fail with a connection
    /// error and in-flight requests fail closed.
    pub fn close(&self) {
        self.available.store(false, Ordering::Release);
    }

    /// Open a request-scoped session.
    pub fn session(&self) -> StoreResult<DbSession> {
        if !self.is_available() {
            return Err(StoreError::Connection {
                reason: "database handle is closed".to_string(),
            });
        }
        Ok(DbSession {
            documents: Arc::clone(&self.documents),
            kv: Arc::clone(&self.kv),
        })
    }

    /// Typed handle to the users collection.
    pub fn users(&self) -> DocumentCollection<UserId, User> {
        DocumentCollection::new(Arc::clone(&self.documents), USERS_COLLECTION)
    }

    /// Typed handle to the credentials collection.
    pub fn credentials(&self) -> DocumentCollection<UserId, Credential> {
        DocumentCollection::new(Arc::clone(&self.documents), CREDENTIALS_COLLECTION)
    }

    /// Typed handle to the friend adjacency namespace.
    pub fn friends(&self) -> KvNamespace<UserId, FriendSet> {
        KvNamespace::new(Arc::clone(&self.kv), FRIENDS_NAMESPACE)
    }
}

/// Request-scoped database session.
///
/// Cheap to clone; shared read-only across all loader fetches within one
/// request. Dropped with the request.
#[derive(Clone)]
pub struct DbSession {
    documents: Arc<DocumentStore>,
    kv: Arc<KvStore>,
}

impl DbSession {
    /// Read capability over user records, for the user loader.
    pub fn user_reader(&self) -> Arc<dyn Reader<UserId, User>> {
        Arc::new(DocumentCollection::new(
            Arc::clone(&self.documents),
            USERS_COLLECTION,
        ))
    }

    /// Read capability over friend adjacency records, for the friend loader.
    pub fn friend_reader(&self) -> Arc<dyn Reader<UserId, FriendSet>> {
        Arc::new(KvNamespace::new(Arc::clone(&self.kv), FRIENDS_NAMESPACE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kindred_core::EntityIdType;
    use kindred_storage::Writer;

    #[tokio::test]
    async fn test_session_shares_data_with_startup_handles() {
        let db = Database::new();
        let user = User::new("Ada", "ada@example.com");
        db.users().put(user.user_id, user.clone()).await.unwrap();

        let session = db.session().expect("session");
        let loaded = session.user_reader().get(&user.user_id).await.unwrap();
        assert_eq!(loaded, Some(user));
    }

    #[test]
    fn test_closed_database_rejects_sessions() {
        let db = Database::new();
        assert!(db.session().is_ok());

        db.close();
        assert!(!db.is_available());
        assert!(matches!(
            db.session(),
            Err(StoreError::Connection { .. })
        ));
    }

    #[tokio::test]
    async fn test_stores_are_split_by_technology() {
        let db = Database::new();
        let owner = UserId::now_v7();
        db.friends()
            .put(owner, FriendSet::empty(owner))
            .await
            .unwrap();

        // Friend records live in the KV store, not the document store.
        assert!(db.users().get(&owner).await.unwrap().is_none());
        assert!(db
            .session()
            .unwrap()
            .friend_reader()
            .get(&owner)
            .await
            .unwrap()
            .is_some());
    }
}
