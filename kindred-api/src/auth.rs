//! Authentication Module
//!
//! Credential inspection for the authentication filter. Three ways in:
//! 1. API Key authentication (via X-API-Key header)
//! 2. JWT token authentication (via Authorization: Bearer header)
//! 3. JWT carried by the `kindred_session` cookie (browser clients)
//!
//! Authentication never touches the backend stores: it only inspects the
//! request's credentials against the process-wide [`AuthConfig`], so a
//! rejected request performs no business reads.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use kindred_core::UserId;

use crate::error::{ApiError, ApiResult};

/// Name of the session cookie carrying a JWT for browser clients.
pub const SESSION_COOKIE: &str = "kindred_session";

const INSECURE_DEFAULT_SECRET: &str = "INSECURE_DEFAULT_SECRET_CHANGE_IN_PRODUCTION";

// ============================================================================
// JWT SECRET (TYPE-SAFE)
// ============================================================================

/// Type-safe JWT secret that prevents accidental logging.
#[derive(Clone)]
pub struct JwtSecret(SecretString);

impl JwtSecret {
    /// Create a new JWT secret with validation.
    ///
    /// # Errors
    /// Returns error if the secret is empty.
    pub fn new(secret: String) -> ApiResult<Self> {
        if secret.is_empty() {
            return Err(ApiError::missing_field("jwt_secret"));
        }
        Ok(Self(SecretString::new(secret.into())))
    }

    /// Expose the secret value (use sparingly, only for signing/verifying).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Check if the secret is the insecure default.
    pub fn is_insecure_default(&self) -> bool {
        self.0.expose_secret() == INSECURE_DEFAULT_SECRET
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JwtSecret([REDACTED, {} chars])", self.0.expose_secret().len())
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Authentication configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Valid API keys (in production, load from secure storage)
    pub api_keys: HashSet<String>,

    /// JWT secret key for signing and verification
    pub jwt_secret: JwtSecret,

    /// JWT token expiration in seconds (default: 1 hour)
    pub jwt_expiration_secs: i64,

    /// JWT clock skew tolerance in seconds (default: 60)
    pub jwt_leeway_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_keys: HashSet::new(),
            jwt_secret: JwtSecret(SecretString::new(INSECURE_DEFAULT_SECRET.into())),
            jwt_expiration_secs: 3600,
            jwt_leeway_secs: 60,
        }
    }
}

impl AuthConfig {
    /// Create AuthConfig from environment variables.
    ///
    /// Environment variables:
    /// - `KINDRED_API_KEYS`: Comma-separated static API keys
    /// - `KINDRED_JWT_SECRET`: HMAC secret for JWT signing
    /// - `KINDRED_JWT_EXPIRATION_SECS`: Token lifetime (default: 3600)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(keys) = std::env::var("KINDRED_API_KEYS") {
            config.api_keys = keys
                .split(',')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect();
        }

        if let Ok(secret) = std::env::var("KINDRED_JWT_SECRET") {
            if let Ok(parsed) = JwtSecret::new(secret) {
                config.jwt_secret = parsed;
            }
        }

        if let Ok(expiration) = std::env::var("KINDRED_JWT_EXPIRATION_SECS") {
            if let Ok(secs) = expiration.parse() {
                config.jwt_expiration_secs = secs;
            }
        }

        config
    }

    /// Add a valid API key.
    pub fn add_api_key(&mut self, key: String) {
        self.api_keys.insert(key);
    }

    /// Reject configurations that must not reach production.
    pub fn validate_for_production(&self) -> ApiResult<()> {
        if self.jwt_secret.is_insecure_default() {
            return Err(ApiError::invalid_input(
                "JWT secret is the insecure default. Set KINDRED_JWT_SECRET.",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// AUTH CONTEXT
// ============================================================================

/// How a request authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    ApiKey,
    Bearer,
    Cookie,
}

/// Authentication verdict attached to the request context.
///
/// `user_id` is present for token-based authentication (the token subject);
/// API keys identify a caller, not a user.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Option<UserId>,
    pub subject: String,
    pub method: AuthMethod,
}

/// JWT claims carried by kindred session tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's identifier.
    pub sub: String,
    /// Issued-at, Unix epoch seconds.
    pub iat: i64,
    /// Expiration, Unix epoch seconds.
    pub exp: i64,
}

// ============================================================================
// TOKEN OPERATIONS
// ============================================================================

/// Generate a signed session token for a user.
pub fn generate_jwt_token(config: &AuthConfig, user_id: UserId) -> ApiResult<String> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + config.jwt_expiration_secs,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.expose().as_bytes()),
    )
    .map_err(|e| ApiError::internal_error(format!("Failed to sign token: {}", e)))
}

/// Validate a session token and build the auth context it represents.
pub fn validate_jwt_token(
    config: &AuthConfig,
    token: &str,
    method: AuthMethod,
) -> ApiResult<AuthContext> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = config.jwt_leeway_secs;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.expose().as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => ApiError::token_expired(),
        _ => ApiError::invalid_token(format!("Token validation failed: {}", e)),
    })?;

    let user_id = data.claims.sub.parse::<UserId>().ok();
    Ok(AuthContext {
        user_id,
        subject: data.claims.sub,
        method,
    })
}

/// Validate a static API key.
pub fn validate_api_key(config: &AuthConfig, key: &str) -> ApiResult<AuthContext> {
    if !config.api_keys.contains(key) {
        return Err(ApiError::unauthorized("Invalid API key"));
    }
    let prefix: String = key.chars().take(6).collect();
    Ok(AuthContext {
        user_id: None,
        subject: format!("api_key_{}", prefix),
        method: AuthMethod::ApiKey,
    })
}

/// Authenticate a request from whichever credential it carries.
///
/// Precedence: API key, then bearer token, then session cookie. A request
/// carrying none of them is rejected.
pub fn authenticate(
    config: &AuthConfig,
    api_key: Option<&str>,
    authorization: Option<&str>,
    cookie_token: Option<&str>,
) -> ApiResult<AuthContext> {
    if let Some(key) = api_key {
        return validate_api_key(config, key);
    }

    if let Some(value) = authorization {
        let token = value.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::invalid_token("Authorization header must use Bearer scheme")
        })?;
        return validate_jwt_token(config, token, AuthMethod::Bearer);
    }

    if let Some(token) = cookie_token {
        return validate_jwt_token(config, token, AuthMethod::Cookie);
    }

    Err(ApiError::unauthorized(
        "Authentication required: provide X-API-Key, Authorization header, or session cookie",
    ))
}

// ============================================================================
// TESTS
// ============================================================================
