//! Service Layer
//!
//! One service per entity family, each an immutable pairing of a Reader
//! and a Writer capability. Services are constructed once at startup,
//! shared read-only across all requests, and hold no per-request state;
//! that lives in the request's loaders.

mod auth_service;
mod friend_service;
mod user_service;

pub use auth_service::AuthService;
pub use friend_service::FriendService;
pub use user_service::UserService;

use std::sync::Arc;

use crate::db::Database;

/// Bundle of all services, built once at process startup.
#[derive(Clone)]
pub struct Services {
    pub users: UserService,
    pub auth: AuthService,
    pub friends: FriendService,
}

impl Services {
    pub fn new(db: &Database) -> Self {
        Self {
            users: UserService::new(Arc::new(db.users()), Arc::new(db.users())),
            auth: AuthService::new(Arc::new(db.credentials()), Arc::new(db.credentials())),
            friends: FriendService::new(Arc::new(db.friends()), Arc::new(db.friends())),
        }
    }
}
