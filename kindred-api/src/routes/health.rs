//! Health Check Routes
//!
//! Liveness endpoint sitting outside the authentication filter: it reports
//! whether the process is up and whether a database session can be opened.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use crate::db::Database;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
}

/// Handler for GET /health.
pub async fn health_handler(State(database): State<Database>) -> impl IntoResponse {
    let db_up = database.session().is_ok();
    let response = HealthResponse {
        status: if db_up { "ok" } else { "degraded" },
        database: if db_up { "up" } else { "down" },
    };
    let status = if db_up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

/// Create the health routes router.
pub fn create_router(database: Database) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(database)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt; // for `oneshot`

    #[tokio::test]
    async fn test_health_reports_ok() {
        let app = create_router(Database::new());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["database"], "up");
    }

    #[tokio::test]
    async fn test_health_reports_degraded_database() {
        let database = Database::new();
        database.close();
        let app = create_router(database);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["database"], "down");
    }
}
