//! Axum Middleware for Database Session Attachment
//!
//! Opens a request-scoped [`DbSession`] and injects it into the request
//! extensions. When the session cannot be acquired the request fails
//! closed with a 503 and nothing downstream of this interceptor runs.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::db::Database;
use crate::error::ApiError;

/// Database session middleware. Runs before the authentication filter.
pub async fn db_session_middleware(
    State(database): State<Database>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session = database.session().map_err(|e| {
        tracing::error!(error = %e, "failed to open database session");
        ApiError::from(e)
    })?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbSession;
    use crate::error::ErrorCode;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Extension, Router,
    };
    use tower::ServiceExt; // for `oneshot`

    async fn probe(Extension(_session): Extension<DbSession>) -> &'static str {
        "session attached"
    }

    fn test_app(database: Database) -> Router {
        Router::new()
            .route("/probe", get(probe))
            .layer(from_fn_with_state(database, db_session_middleware))
    }

    #[tokio::test]
    async fn test_session_is_attached() {
        let app = test_app(Database::new());

        let response = app
            .oneshot(Request::builder().uri("/probe").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_closed_database_short_circuits_with_503() {
        let database = Database::new();
        database.close();
        let app = test_app(database);

        let response = app
            .oneshot(Request::builder().uri("/probe").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            error["code"],
            serde_json::to_value(ErrorCode::ConnectionFailed).unwrap()
        );
    }
}
