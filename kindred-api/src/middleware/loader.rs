//! Axum Middleware for Loader Attachment
//!
//! Constructs a fresh [`RequestLoaders`] bound to the request's database
//! session and injects it into the request extensions. Innermost
//! interceptor before query execution: it only runs for requests that
//! passed session acquisition and authentication, so no loader is ever
//! built for a rejected request.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use kindred_storage::LoaderConfig;

use crate::db::DbSession;
use crate::error::ApiError;
use crate::loaders::RequestLoaders;

// ============================================================================
// MIDDLEWARE STATE
// ============================================================================

/// Shared state for loader attachment: the process-wide loader tuning.
#[derive(Debug, Clone, Default)]
pub struct LoaderAttachState {
    pub config: LoaderConfig,
}

impl LoaderAttachState {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }
}

// ============================================================================
// MIDDLEWARE FUNCTION
// ============================================================================

/// Loader attachment middleware. Runs after the authentication filter.
pub async fn loader_middleware(
    State(state): State<LoaderAttachState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session = request
        .extensions()
        .get::<DbSession>()
        .cloned()
        .ok_or_else(|| {
            ApiError::internal_error(
                "Database session missing from request extensions. \
                 Ensure db_session_middleware runs before loader_middleware.",
            )
        })?;

    let loaders = RequestLoaders::new(&session, state.config.clone());
    request.extensions_mut().insert(loaders);
    Ok(next.run(request).await)
}

// ============================================================================
// TYPED EXTRACTOR
// ============================================================================

/// Typed Axum extractor for the request's loader set.
#[derive(Clone)]
pub struct LoaderExtractor(pub RequestLoaders);

#[axum::async_trait]
impl<S> FromRequestParts<S> for LoaderExtractor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestLoaders>()
            .cloned()
            .map(LoaderExtractor)
            .ok_or_else(|| {
                ApiError::internal_error(
                    "RequestLoaders not found in request extensions. \
                     Ensure loader_middleware is applied to this route.",
                )
            })
    }
}

// ============================================================================
// TESTS
// ============================================================================
