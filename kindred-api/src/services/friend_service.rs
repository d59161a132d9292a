//! Friend Relation Service
//!
//! Domain operations over friend adjacency records. Edges are symmetric:
//! adding or removing a friendship writes both users' records, one atomic
//! put each, with no multi-record transaction assumed.

use std::sync::Arc;

use kindred_core::{FriendSet, UserId, ValidationError};
use kindred_storage::{Reader, Writer};

use crate::error::ApiResult;

#[derive(Clone)]
pub struct FriendService {
    reader: Arc<dyn Reader<UserId, FriendSet>>,
    writer: Arc<dyn Writer<UserId, FriendSet>>,
}

impl FriendService {
    pub fn new(
        reader: Arc<dyn Reader<UserId, FriendSet>>,
        writer: Arc<dyn Writer<UserId, FriendSet>>,
    ) -> Self {
        Self { reader, writer }
    }

    /// List the friend ids of a user. A user with no adjacency record has
    /// no friends.
    pub async fn friends_of(&self, user_id: UserId) -> ApiResult<Vec<UserId>> {
        Ok(self
            .reader
            .get(&user_id)
            .await?
            .map(|set| set.friend_ids)
            .unwrap_or_default())
    }

    /// Create a symmetric friendship edge between two users.
    pub async fn add_friend(&self, user_id: UserId, friend_id: UserId) -> ApiResult<()> {
        if user_id == friend_id {
            return Err(ValidationError::InvalidValue {
                field: "friend_id".to_string(),
                reason: "a user cannot befriend themselves".to_string(),
            }
            .into());
        }

        self.link(user_id, friend_id).await?;
        self.link(friend_id, user_id).await?;
        Ok(())
    }

    /// Remove a symmetric friendship edge. Returns whether any edge existed.
    pub async fn remove_friend(&self, user_id: UserId, friend_id: UserId) -> ApiResult<bool> {
        let a = self.unlink(user_id, friend_id).await?;
        let b = self.unlink(friend_id, user_id).await?;
        Ok(a || b)
    }

    /// Detach a user from every friend's adjacency record and drop their
    /// own. Used when a user account is deleted.
    pub async fn detach_all(&self, user_id: UserId) -> ApiResult<()> {
        let friends = self.friends_of(user_id).await?;
        for friend_id in friends {
            self.unlink(friend_id, user_id).await?;
        }
        self.writer.delete(&user_id).await?;
        Ok(())
    }

    async fn link(&self, owner: UserId, friend_id: UserId) -> ApiResult<()> {
        let mut set = self
            .reader
            .get(&owner)
            .await?
            .unwrap_or_else(|| FriendSet::empty(owner));
        if set.insert(friend_id) {
            self.writer.put(owner, set).await?;
        }
        Ok(())
    }

    async fn unlink(&self, owner: UserId, friend_id: UserId) -> ApiResult<bool> {
        let Some(mut set) = self.reader.get(&owner).await? else {
            return Ok(false);
        };
        if !set.remove(friend_id) {
            return Ok(false);
        }
        self.writer.put(owner, set).await?;
        Ok(true)
    }
}

// =============================================================================
// TESTS
// =============================================================================
