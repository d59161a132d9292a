//! User Service
//!
//! Domain operations over user profile records, expressed purely in terms
//! of the Reader/Writer capabilities. The service never sees which store
//! technology backs them.

use std::sync::Arc;

use kindred_core::{User, UserId};
use kindred_storage::{Reader, Writer};

use crate::error::{ApiError, ApiResult};
use crate::validation::{validate_email, validate_name};

#[derive(Clone)]
pub struct UserService {
    reader: Arc<dyn Reader<UserId, User>>,
    writer: Arc<dyn Writer<UserId, User>>,
}

impl UserService {
    pub fn new(
        reader: Arc<dyn Reader<UserId, User>>,
        writer: Arc<dyn Writer<UserId, User>>,
    ) -> Self {
        Self { reader, writer }
    }

    /// Get a user by id. A missing user is `Ok(None)`, not an error.
    pub async fn get_user(&self, user_id: UserId) -> ApiResult<Option<User>> {
        Ok(self.reader.get(&user_id).await?)
    }

    /// Create a user from validated input.
    pub async fn create_user(&self, name: &str, email: &str) -> ApiResult<User> {
        validate_name(name)?;
        validate_email(email)?;

        let user = User::new(name.trim(), email.trim());
        self.writer.put(user.user_id, user.clone()).await?;
        Ok(user)
    }

    /// Update a user's profile fields.
    pub async fn update_user(
        &self,
        user_id: UserId,
        name: Option<&str>,
        email: Option<&str>,
    ) -> ApiResult<User> {
        let mut user = self
            .reader
            .get(&user_id)
            .await?
            .ok_or_else(|| ApiError::user_not_found(user_id))?;

        if let Some(name) = name {
            validate_name(name)?;
            user.name = name.trim().to_string();
        }
        if let Some(email) = email {
            validate_email(email)?;
            user.email = email.trim().to_string();
        }
        user.touch();

        self.writer.put(user_id, user.clone()).await?;
        Ok(user)
    }

    /// Delete a user record. Returns whether it existed.
    pub async fn delete_user(&self, user_id: UserId) -> ApiResult<bool> {
        Ok(self.writer.delete(&user_id).await?)
    }
}

// =============================================================================
// TESTS
// =============================================================================
