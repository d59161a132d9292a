//! Input validation for service-level operations.
//!
//! Malformed input is rejected with a `ValidationError` before any store
//! call is made; validation failures are never retried.

use kindred_core::ValidationError;

const MAX_NAME_LEN: usize = 120;
const MIN_PASSWORD_LEN: usize = 8;

/// Validate a user display name.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: "name".to_string(),
        });
    }
    if trimmed.len() > MAX_NAME_LEN {
        return Err(ValidationError::InvalidValue {
            field: "name".to_string(),
            reason: format!("must be at most {} characters", MAX_NAME_LEN),
        });
    }
    Ok(())
}

/// Validate an email address. Deliberately shallow: the check guards
/// against obviously broken input, not RFC conformance.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: "email".to_string(),
        });
    }
    let has_at = email.split_once('@').map(|(local, domain)| {
        !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
    });
    if has_at != Some(true) || email.contains(char::is_whitespace) {
        return Err(ValidationError::InvalidValue {
            field: "email".to_string(),
            reason: "must be a plausible address like user@example.com".to_string(),
        });
    }
    Ok(())
}

/// Validate a password for credential registration.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ValidationError::InvalidValue {
            field: "password".to_string(),
            reason: format!("must be at least {} characters", MIN_PASSWORD_LEN),
        });
    }
    Ok(())
}
