//! Request-scoped loader set.
//!
//! One [`RequestLoaders`] is built per request by the loader-attachment
//! middleware, bound to that request's database session. Resolvers reach
//! the batching-eligible record families (users, friend adjacency) only
//! through these loaders; mutations go through the services instead.

use std::sync::Arc;

use kindred_core::{FriendSet, User, UserId};
use kindred_storage::{Loader, LoaderConfig};

use crate::db::DbSession;

/// The loaders available to one request's query execution.
#[derive(Clone)]
pub struct RequestLoaders {
    pub users: Arc<Loader<UserId, User>>,
    pub friends: Arc<Loader<UserId, FriendSet>>,
}

impl RequestLoaders {
    /// Build fresh loaders over the given session's readers.
    pub fn new(session: &DbSession, config: LoaderConfig) -> Self {
        Self {
            users: Arc::new(Loader::with_config(session.user_reader(), config.clone())),
            friends: Arc::new(Loader::with_config(session.friend_reader(), config)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use kindred_core::EntityIdType;
    use kindred_storage::Writer;

    #[tokio::test]
    async fn test_loaders_read_through_the_session() {
        let db = Database::new();
        let user = User::new("Ada", "ada@example.com");
        db.users().put(user.user_id, user.clone()).await.unwrap();

        let session = db.session().unwrap();
        let loaders = RequestLoaders::new(&session, LoaderConfig::default());

        let loaded = loaders.users.load(user.user_id).await.unwrap();
        assert_eq!(loaded, Some(user));
        assert!(loaders
            .friends
            .load(UserId::now_v7())
            .await
            .unwrap()
            .is_none());
    }
}
