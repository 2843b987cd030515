//! Principal resolution: subject (username) → authenticated principal.
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::error;

use crate::repos::user_repo::UserRepo;

/// Identity resolved from a token subject.
///
/// Authorization code reads `authorities`; the auth core never inspects them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub username: String,
    pub authorities: Vec<String>,
}

#[derive(Debug, Error)]
pub enum PrincipalError {
    #[error("principal not found")]
    NotFound,
    #[error("principal lookup failed: {0}")]
    Backend(String),
}

#[async_trait]
pub trait PrincipalLoader: Send + Sync {
    async fn load_by_subject(&self, subject: &str) -> Result<Principal, PrincipalError>;
}

/// Loads principals from the users table.
#[derive(Clone)]
pub struct RepoPrincipalLoader {
    users: Arc<dyn UserRepo>,
}

impl RepoPrincipalLoader {
    pub fn new(users: Arc<dyn UserRepo>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl PrincipalLoader for RepoPrincipalLoader {
    async fn load_by_subject(&self, subject: &str) -> Result<Principal, PrincipalError> {
        let row = self
            .users
            .find_by_username(subject)
            .await
            .map_err(|e| {
                error!(subject = %subject, error = %e, "failed to load principal");
                PrincipalError::Backend(e.to_string())
            })?
            .ok_or(PrincipalError::NotFound)?;

        // users has no role column yet; every principal starts without authorities
        Ok(Principal {
            user_id: row.id,
            username: row.username,
            authorities: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryUserRepo, sample_new_user};

    #[tokio::test]
    async fn resolves_existing_username() {
        let repo = Arc::new(InMemoryUserRepo::default());
        let created = repo.create(&sample_new_user("alice")).await.unwrap();
        let loader = RepoPrincipalLoader::new(repo);

        let principal = loader.load_by_subject("alice").await.unwrap();

        assert_eq!(principal.user_id, created.id);
        assert_eq!(principal.username, "alice");
        assert!(principal.authorities.is_empty());
    }

    #[tokio::test]
    async fn unknown_username_is_not_found() {
        let loader = RepoPrincipalLoader::new(Arc::new(InMemoryUserRepo::default()));

        let err = loader.load_by_subject("ghost").await.unwrap_err();

        assert!(matches!(err, PrincipalError::NotFound));
    }

    #[tokio::test]
    async fn repo_failure_is_a_backend_error() {
        let repo = Arc::new(InMemoryUserRepo::default());
        repo.fail_next_lookup();
        let loader = RepoPrincipalLoader::new(repo);

        let err = loader.load_by_subject("alice").await.unwrap_err();

        assert!(matches!(err, PrincipalError::Backend(_)));
    }
}
