//! kindred Core - Entity Types
//!
//! Pure data structures with no behavior. All other crates depend on this.
//! This crate contains ONLY data types - no business logic, no I/O.

pub mod entities;
pub mod error;
pub mod identity;

pub use entities::{Credential, FriendSet, User};
pub use error::{CoreError, CoreResult, StoreError, StoreResult, ValidationError};
pub use identity::{EntityIdType, Timestamp, UserId};
