//! kindred API - HTTP gateway for the kindred social graph
//!
//! This crate exposes the query-serving surface: an axum router whose
//! `/query` endpoint runs a GraphQL executor behind an ordered middleware
//! chain (latency, database session, authentication, loader attachment).
//! Services are constructed once at startup and injected explicitly; all
//! per-request state lives in request extensions and the request-scoped
//! loaders.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod loaders;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod validation;

// Re-export commonly used types
pub use auth::{
    authenticate, generate_jwt_token, validate_api_key, validate_jwt_token, AuthConfig,
    AuthContext, AuthMethod, Claims,
};
pub use config::ApiConfig;
pub use db::{Database, DbSession};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use loaders::RequestLoaders;
pub use middleware::{
    auth_middleware, db_session_middleware, latency_middleware, loader_middleware, AuthExtractor,
    AuthMiddlewareState, Elapsed, LoaderAttachState, LoaderExtractor,
};
pub use routes::create_api_router;
pub use services::{AuthService, FriendService, Services, UserService};
