//! Axum Middleware for Request Latency Measurement
//!
//! Wraps the entire downstream chain: the elapsed duration covers success
//! and short-circuited requests alike, and exactly one record is emitted
//! per request.

use std::time::{Duration, Instant};

use axum::{extract::Request, middleware::Next, response::Response};

/// Elapsed wall-clock duration of a completed request.
///
/// Attached to the response extensions so the measurement is observable in
/// tests and by outer layers, in addition to the tracing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed(pub Duration);

/// Latency middleware. Outermost interceptor of the chain.
pub async fn latency_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let mut response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status();
    response.extensions_mut().insert(Elapsed(elapsed));

    tracing::info!(
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration_ms = elapsed.as_millis() as u64,
        "request completed"
    );

    response
}

// ============================================================================
// TESTS
// ============================================================================
