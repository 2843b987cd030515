//! Username/password verification for the login flow.
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error};

use crate::repos::user_repo::UserRepo;
use crate::services::password::PasswordHasher;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential lookup failed: {0}")]
    Backend(String),
}

#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// `Ok(false)` for an unknown user or a wrong password.
    async fn verify(&self, username: &str, raw_password: &str) -> Result<bool, CredentialError>;
}

#[derive(Clone)]
pub struct RepoCredentialVerifier {
    users: Arc<dyn UserRepo>,
    passwords: PasswordHasher,
}

impl RepoCredentialVerifier {
    pub fn new(users: Arc<dyn UserRepo>, passwords: PasswordHasher) -> Self {
        Self { users, passwords }
    }
}

#[async_trait]
impl CredentialVerifier for RepoCredentialVerifier {
    async fn verify(&self, username: &str, raw_password: &str) -> Result<bool, CredentialError> {
        let row = self.users.find_by_username(username).await.map_err(|e| {
            error!(username = %username, error = %e, "failed to look up credentials");
            CredentialError::Backend(e.to_string())
        })?;

        let Some(row) = row else {
            debug!(username = %username, "login for unknown user");
            return Ok(false);
        };

        Ok(self.passwords.verify(raw_password, &row.password_hash).await)
    }
}
