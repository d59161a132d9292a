//! Middleware modules for the kindred gateway
//!
//! This module contains the request pipeline's interceptors:
//!
//! - `latency`: elapsed-duration measurement around the whole chain
//! - `db_session`: database session acquisition (503 on failure)
//! - `auth`: authentication filter (401 short-circuit)
//! - `loader`: request-scoped loader attachment
//!
//! # Middleware Order
//!
//! Ordering is mandated and composed in one place (`routes::create_api_router`).
//! Layers execute outermost-first on the way in and unwind in reverse:
//!
//! ```ignore
//! Router::new()
//!     .route("/query", post(graphql_handler))
//!     // Innermost (runs last on request): attach fresh loaders
//!     .layer(middleware::from_fn_with_state(loader_state, loader_middleware))
//!     // Auth runs before loaders; a rejected request never builds them
//!     .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
//!     // Session acquisition runs before auth
//!     .layer(middleware::from_fn_with_state(database, db_session_middleware))
//!     // Latency measurement wraps everything, short-circuits included
//!     .layer(middleware::from_fn(latency_middleware))
//! ```
//!
//! Every interceptor that short-circuits still unwinds through the latency
//! layer, so exactly one elapsed-duration record is emitted per request.

mod auth;
mod db_session;
mod latency;
mod loader;

pub use auth::{auth_middleware, AuthExtractor, AuthMiddlewareState};
pub use db_session::db_session_middleware;
pub use latency::{latency_middleware, Elapsed};
pub use loader::{loader_middleware, LoaderAttachState, LoaderExtractor};
