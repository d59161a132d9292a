//! API Routes Module
//!
//! Assembles the gateway's router: the `/query` endpoint behind the full
//! middleware chain, the GraphiQL playground, health checks outside the
//! authentication filter, and CORS for browser clients.
//!
//! The chain is composed in exactly one place so its mandated order is
//! explicit and testable:
//!
//! 1. Latency measurement (outermost, wraps short-circuits too)
//! 2. Database session attachment (503 on acquisition failure)
//! 3. Authentication filter (401 short-circuit, no backend calls)
//! 4. Loader attachment (fresh per-request loaders)
//! 5. Query execution (terminal handler)

pub mod graphql;
pub mod health;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::auth::AuthConfig;
use crate::config::ApiConfig;
use crate::db::Database;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{
    auth_middleware, db_session_middleware, latency_middleware, loader_middleware,
    AuthMiddlewareState, LoaderAttachState,
};
use crate::services::Services;

/// Check if running in a production environment.
fn is_production_environment() -> bool {
    std::env::var("KINDRED_ENVIRONMENT")
        .map(|e| matches!(e.to_lowercase().as_str(), "production" | "prod"))
        .unwrap_or(false)
}

/// Build the complete gateway router.
///
/// Services and the database handle are constructed by the caller and
/// injected here; nothing in the pipeline reaches for ambient globals.
pub fn create_api_router(
    db: Database,
    services: Arc<Services>,
    api_config: &ApiConfig,
    auth_config: AuthConfig,
) -> ApiResult<Router> {
    if is_production_environment() {
        auth_config.validate_for_production()?;
        if !api_config.is_production() {
            return Err(ApiError::invalid_input(
                "CORS origins not configured for production. Set KINDRED_CORS_ORIGINS.",
            ));
        }
    }

    let schema = graphql::create_schema(services, Arc::new(auth_config.clone()));
    let auth_state = AuthMiddlewareState::new(auth_config);
    let loader_state = LoaderAttachState::new(api_config.loader_config());

    // The chain around /query, innermost layer listed first.
    let query_routes = Router::new()
        .route("/query", post(graphql::graphql_handler))
        .with_state(schema)
        .layer(from_fn_with_state(loader_state, loader_middleware))
        .layer(from_fn_with_state(auth_state, auth_middleware))
        .layer(from_fn_with_state(db.clone(), db_session_middleware));

    Ok(Router::new()
        .merge(query_routes)
        .route("/", get(graphql::graphiql_handler))
        .merge(health::create_router(db))
        .layer(from_fn(latency_middleware))
        .layer(build_cors_layer(api_config)))
}

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
/// In production mode, only allows configured origins.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-api-key"),
        ])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use kindred_core::User;
    use tower::ServiceExt; // for `oneshot`

    const TEST_API_KEY: &str = "test_key_123";

    struct TestGateway {
        app: Router,
        services: Arc<Services>,
        db: Database,
    }

    fn gateway() -> TestGateway {
        let db = Database::new();
        let services = Arc::new(Services::new(&db));
        let mut auth_config = AuthConfig::default();
        auth_config.add_api_key(TEST_API_KEY.to_string());

        let app = create_api_router(
            db.clone(),
            Arc::clone(&services),
            &ApiConfig::default(),
            auth_config,
        )
        .expect("router");

        TestGateway { app, services, db }
    }

    fn query_request(query: &str, api_key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/query")
            .header("content-type", "application/json");
        if let Some(key) = api_key {
            builder = builder.header("x-api-key", key);
        }
        builder
            .body(Body::from(
                serde_json::json!({ "query": query }).to_string(),
            ))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn seed_user(gateway: &TestGateway, name: &str, email: &str) -> User {
        gateway
            .services
            .users
            .create_user(name, email)
            .await
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unauthenticated_query_is_rejected() {
        let gateway = gateway();

        let response = gateway
            .app
            .clone()
            .oneshot(query_request("{ viewer { id } }", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["code"], "UNAUTHORIZED");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_query_resolves_seeded_graph() {
        let gateway = gateway();
        let ada = seed_user(&gateway, "Ada", "ada@example.com").await;
        let brian = seed_user(&gateway, "Brian", "brian@example.com").await;
        gateway
            .services
            .friends
            .add_friend(ada.user_id, brian.user_id)
            .await
            .unwrap();

        let query = format!(
            r#"{{ user(id: "{}") {{ name friends {{ name }} }} }}"#,
            ada.user_id
        );
        let response = gateway
            .app
            .clone()
            .oneshot(query_request(&query, Some(TEST_API_KEY)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json["errors"].is_null(), "{}", json);
        assert_eq!(json["data"]["user"]["name"], "Ada");
        assert_eq!(json["data"]["user"]["friends"][0]["name"], "Brian");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_loader_cache_never_crosses_requests() {
        let gateway = gateway();
        let ada = seed_user(&gateway, "Ada", "ada@example.com").await;
        let query = format!(r#"{{ user(id: "{}") {{ name }} }}"#, ada.user_id);

        let response = gateway
            .app
            .clone()
            .oneshot(query_request(&query, Some(TEST_API_KEY)))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["data"]["user"]["name"], "Ada");

        // Mutate between requests; a cross-request cache would serve the
        // stale profile.
        gateway
            .services
            .users
            .update_user(ada.user_id, Some("Ada Lovelace"), None)
            .await
            .unwrap();

        let response = gateway
            .app
            .clone()
            .oneshot(query_request(&query, Some(TEST_API_KEY)))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["data"]["user"]["name"], "Ada Lovelace");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_closed_database_fails_query_closed() {
        let gateway = gateway();
        gateway.db.close();

        let response = gateway
            .app
            .clone()
            .oneshot(query_request("{ viewer { id } }", Some(TEST_API_KEY)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_health_is_reachable_without_credentials() {
        let gateway = gateway();

        let response = gateway
            .app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_playground_is_served_at_root() {
        let gateway = gateway();

        let response = gateway
            .app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_mutation_roundtrip_over_http() {
        let gateway = gateway();
        let ada = seed_user(&gateway, "Ada", "ada@example.com").await;
        let brian = seed_user(&gateway, "Brian", "brian@example.com").await;

        let mutation = format!(
            r#"mutation {{ addFriend(userId: "{}", friendId: "{}") }}"#,
            ada.user_id, brian.user_id
        );
        let response = gateway
            .app
            .clone()
            .oneshot(query_request(&mutation, Some(TEST_API_KEY)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["addFriend"], true);

        assert_eq!(
            gateway
                .services
                .friends
                .friends_of(ada.user_id)
                .await
                .unwrap(),
            vec![brian.user_id]
        );
    }
}
