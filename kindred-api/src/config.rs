//! API Configuration Module
//!
//! Configuration for CORS and the loader's batching window. Loaded from
//! environment variables with sensible defaults for development.

use std::time::Duration;

use kindred_storage::LoaderConfig;

/// API configuration for CORS and request-pipeline tuning.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    /// Batching window for request-scoped loaders, in milliseconds.
    pub batch_window_ms: u64,

    /// Queue size at which a loader flushes its batch early.
    pub batch_max_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        let loader = LoaderConfig::default();
        Self {
            cors_origins: Vec::new(), // Empty = allow all
            cors_max_age_secs: 86400, // 24 hours
            batch_window_ms: loader.batch_window.as_millis() as u64,
            batch_max_size: loader.max_batch_size,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `KINDRED_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `KINDRED_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `KINDRED_BATCH_WINDOW_MS`: Loader batching window (default: 2)
    /// - `KINDRED_BATCH_MAX_SIZE`: Loader queue flush threshold (default: 64)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cors_origins = std::env::var("KINDRED_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_max_age_secs = std::env::var("KINDRED_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.cors_max_age_secs);

        let batch_window_ms = std::env::var("KINDRED_BATCH_WINDOW_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.batch_window_ms);

        let batch_max_size = std::env::var("KINDRED_BATCH_MAX_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.batch_max_size);

        Self {
            cors_origins,
            cors_max_age_secs,
            batch_window_ms,
            batch_max_size,
        }
    }

    /// Loader configuration derived from this API configuration.
    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig::new()
            .with_batch_window(Duration::from_millis(self.batch_window_ms))
            .with_max_batch_size(self.batch_max_size)
    }

    /// Check if running in production mode (strict CORS).
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }
}
