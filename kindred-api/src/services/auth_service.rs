//! Auth Service
//!
//! Domain operations over credential records: registration and
//! verification of salted password digests. The service stores digests
//! only; plaintext passwords never leave the call stack.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use kindred_core::{Credential, UserId};
use kindred_storage::{Reader, Writer};

use crate::error::{ApiError, ApiResult};
use crate::validation::validate_password;

#[derive(Clone)]
pub struct AuthService {
    reader: Arc<dyn Reader<UserId, Credential>>,
    writer: Arc<dyn Writer<UserId, Credential>>,
}

impl AuthService {
    pub fn new(
        reader: Arc<dyn Reader<UserId, Credential>>,
        writer: Arc<dyn Writer<UserId, Credential>>,
    ) -> Self {
        Self { reader, writer }
    }

    /// Register (or replace) the credential for a user.
    pub async fn register_credential(
        &self,
        user_id: UserId,
        password: &str,
    ) -> ApiResult<Credential> {
        validate_password(password)?;

        let salt = generate_salt();
        let credential = Credential::new(user_id, &salt, hash_password(&salt, password));
        self.writer.put(user_id, credential.clone()).await?;
        Ok(credential)
    }

    /// Verify a password against the stored digest.
    ///
    /// Returns false for a wrong password; a user with no registered
    /// credential is a not-found error, distinct from a failed match.
    pub async fn verify_credential(&self, user_id: UserId, password: &str) -> ApiResult<bool> {
        let credential = self
            .reader
            .get(&user_id)
            .await?
            .ok_or_else(|| ApiError::credential_not_found(user_id))?;

        Ok(hash_password(&credential.salt, password) == credential.password_hash)
    }

    /// Remove a user's credential. Returns whether one existed.
    pub async fn remove_credential(&self, user_id: UserId) -> ApiResult<bool> {
        Ok(self.writer.delete(&user_id).await?)
    }
}

fn generate_salt() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

// =============================================================================
// TESTS
// =============================================================================
