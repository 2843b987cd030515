/*
 * Responsibility
 * - パスワードのハッシュ化 (argon2, PHC 文字列) と照合
 * - CPU を食うので spawn_blocking で runtime の外で回す
 */
use argon2::{Argon2, PasswordHasher as _, PasswordVerifier as _};
use password_hash::{PasswordHash, SaltString};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("failed to gather salt entropy: {0}")]
    Entropy(String),
    #[error("failed to hash password: {0}")]
    Hash(String),
    #[error("hashing task failed")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Clone, Default)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    pub async fn hash(&self, raw_password: &str) -> Result<String, PasswordError> {
        let argon2 = self.argon2.clone();
        let raw_password = raw_password.to_owned();
        tokio::task::spawn_blocking(move || hash_blocking(&argon2, &raw_password)).await?
    }

    /// `false` on mismatch and on a stored hash that cannot be parsed.
    pub async fn verify(&self, raw_password: &str, password_hash: &str) -> bool {
        let argon2 = self.argon2.clone();
        let raw_password = raw_password.to_owned();
        let password_hash = password_hash.to_owned();

        tokio::task::spawn_blocking(move || verify_blocking(&argon2, &raw_password, &password_hash))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "password verification task failed");
                false
            })
    }
}

fn hash_blocking(argon2: &Argon2<'_>, raw_password: &str) -> Result<String, PasswordError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::fill(&mut salt_bytes).map_err(|e| PasswordError::Entropy(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| PasswordError::Hash(e.to_string()))?;

    let phc = argon2
        .hash_password(raw_password.as_bytes(), &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?
        .to_string();
    Ok(phc)
}

fn verify_blocking(argon2: &Argon2<'_>, raw_password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => argon2
            .verify_password(raw_password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
