//! Domain entities for the kindred gateway.
//!
//! Pure data structures with no storage logic. The document store holds
//! [`User`] and [`Credential`] records; the key-value store holds one
//! [`FriendSet`] adjacency record per user.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::identity::{EntityIdType, Timestamp, UserId};

/// A user profile record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// Create a new user with a fresh identifier and current timestamps.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: UserId::now_v7(),
            name: name.into(),
            email: email.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the record as modified now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// An authentication record, one per user, keyed by the user's identifier.
///
/// Holds a salted password digest, never the password itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub user_id: UserId,
    pub salt: String,
    pub password_hash: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Credential {
    /// Create a credential record from an already-computed digest.
    pub fn new(user_id: UserId, salt: impl Into<String>, password_hash: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            salt: salt.into(),
            password_hash: password_hash.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Friend adjacency record for one user.
///
/// Stored in the key-value store under the owning user's identifier. Edges
/// are symmetric at the service layer: adding a friendship writes both
/// users' records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendSet {
    pub user_id: UserId,
    pub friend_ids: Vec<UserId>,
    pub updated_at: Timestamp,
}

impl FriendSet {
    /// Create an empty adjacency record for a user.
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            friend_ids: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Whether `friend_id` is already an edge of this record.
    pub fn contains(&self, friend_id: UserId) -> bool {
        self.friend_ids.contains(&friend_id)
    }

    /// Add an edge. Returns false if the edge was already present.
    pub fn insert(&mut self, friend_id: UserId) -> bool {
        if self.contains(friend_id) {
            return false;
        }
        self.friend_ids.push(friend_id);
        self.updated_at = Utc::now();
        true
    }

    /// Remove an edge. Returns false if the edge was not present.
    pub fn remove(&mut self, friend_id: UserId) -> bool {
        let before = self.friend_ids.len();
        self.friend_ids.retain(|id| *id != friend_id);
        if self.friend_ids.len() == before {
            return false;
        }
        self.updated_at = Utc::now();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_has_fresh_id_and_timestamps() {
        let user = User::new("Ada", "ada@example.com");
        assert_eq!(user.user_id.as_uuid().get_version_num(), 7);
        assert_eq!(user.created_at, user.updated_at);
    }

    #[test]
    fn test_user_serde_roundtrip() {
        let user = User::new("Ada", "ada@example.com");
        let json = serde_json::to_value(&user).expect("serialize");
        let back: User = serde_json::from_value(json).expect("deserialize");
        assert_eq!(user, back);
    }

    #[test]
    fn test_friend_set_insert_is_idempotent() {
        let mut set = FriendSet::empty(UserId::now_v7());
        let friend = UserId::now_v7();
        assert!(set.insert(friend));
        assert!(!set.insert(friend));
        assert_eq!(set.friend_ids.len(), 1);
    }

    #[test]
    fn test_friend_set_remove() {
        let mut set = FriendSet::empty(UserId::now_v7());
        let friend = UserId::now_v7();
        set.insert(friend);
        assert!(set.remove(friend));
        assert!(!set.remove(friend));
        assert!(set.friend_ids.is_empty());
    }
}
