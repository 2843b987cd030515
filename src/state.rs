/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - users: UserRepo, tokens: TokenService, authenticator, credentials, passwords
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::repos::user_repo::UserRepo;
use crate::services::auth::{CredentialVerifier, RequestAuthenticator, TokenService};
use crate::services::password::PasswordHasher;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepo>,
    pub tokens: Arc<TokenService>,
    pub authenticator: Arc<RequestAuthenticator>,
    pub credentials: Arc<dyn CredentialVerifier>,
    pub passwords: PasswordHasher,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserRepo>,
        tokens: Arc<TokenService>,
        authenticator: Arc<RequestAuthenticator>,
        credentials: Arc<dyn CredentialVerifier>,
        passwords: PasswordHasher,
    ) -> Self {
        Self {
            users,
            tokens,
            authenticator,
            credentials,
            passwords,
        }
    }
}
