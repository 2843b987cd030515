/**
 * Responsibility
 * - repo が上位に伝える意味の定義
 */
use thiserror::Error;

const UNIQUE_VIOLATION: &str = "23505";

/// Which unique constraint a write ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueKey {
    Username,
    Email,
    Other,
}

impl UniqueKey {
    fn from_constraint(name: Option<&str>) -> Self {
        match name {
            Some("users_username_key") => Self::Username,
            Some("users_email_key") => Self::Email,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("db error")]
    Db(#[from] sqlx::Error),
    #[error("conflict on {0:?}")]
    Conflict(UniqueKey),
}

impl RepoError {
    pub fn from_sqlx(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(dbe) = &e
            && dbe.code().as_deref() == Some(UNIQUE_VIOLATION)
        {
            return RepoError::Conflict(UniqueKey::from_constraint(dbe.constraint()));
        }
        RepoError::Db(e)
    }
}

pub type RepoResult<T> = Result<T, RepoError>;
