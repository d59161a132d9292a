//! Identity types for kindred entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Common behavior for typed entity identifiers.
///
/// Identifiers are UUIDv7 under the hood, making them timestamp-sortable
/// while staying opaque to callers. Storage adapters only rely on this
/// trait, never on a concrete identifier type.
pub trait EntityIdType:
    Copy + Eq + std::hash::Hash + fmt::Display + Send + Sync + 'static
{
    /// Wrap an existing UUID.
    fn new(id: Uuid) -> Self;

    /// Generate a fresh UUIDv7 identifier.
    fn now_v7() -> Self;

    /// The underlying UUID.
    fn as_uuid(&self) -> Uuid;
}

/// Identifier for a user record (and for the records keyed by user:
/// credentials and friend adjacency sets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl EntityIdType for UserId {
    fn new(id: Uuid) -> Self {
        Self(id)
    }

    fn now_v7() -> Self {
        Self(Uuid::now_v7())
    }

    fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_is_v7() {
        let id = UserId::now_v7();
        assert_eq!(id.as_uuid().get_version_num(), 7);
    }

    #[test]
    fn test_user_id_display_roundtrip() {
        let id = UserId::now_v7();
        let parsed: UserId = id.to_string().parse().expect("valid uuid string");
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_user_id_serde_is_transparent() {
        let id = UserId::new(Uuid::nil());
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000000\"");
    }
}
