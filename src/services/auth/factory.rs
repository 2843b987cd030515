/// Factory: build the auth services from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::repos::user_repo::UserRepo;
use crate::services::auth::{
    RepoPrincipalLoader, RequestAuthenticator, TokenService, clock::SystemClock,
};

pub fn build_token_service(config: &Config) -> Arc<TokenService> {
    Arc::new(TokenService::new(
        config.jwt_secret.as_bytes(),
        config.jwt_expiration,
        Arc::new(SystemClock),
    ))
}

pub fn build_authenticator(
    config: &Config,
    tokens: Arc<TokenService>,
    users: Arc<dyn UserRepo>,
) -> Arc<RequestAuthenticator> {
    let principals = Arc::new(RepoPrincipalLoader::new(users));
    Arc::new(RequestAuthenticator::new(
        tokens,
        principals,
        config.principal_lookup_timeout,
    ))
}
