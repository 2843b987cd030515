/*
 * Responsibility
 * - Authorization: Bearer <token> からリクエストの認証結果を作る
 * - 失敗しても request は止めない (Unauthenticated を返すだけ)
 * - 拒否 (401) は AuthCtxExtractor 側の責務
 */
use std::{sync::Arc, time::Duration};

use axum::http::{HeaderMap, header};
use tracing::{debug, warn};

use crate::services::auth::principal::{Principal, PrincipalError, PrincipalLoader};
use crate::services::auth::token::TokenService;

pub const BEARER_PREFIX: &str = "Bearer ";

/// Per-request authentication result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(Principal),
    Unauthenticated,
}

#[derive(Clone)]
pub struct RequestAuthenticator {
    tokens: Arc<TokenService>,
    principals: Arc<dyn PrincipalLoader>,
    lookup_timeout: Duration,
}

impl std::fmt::Debug for RequestAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestAuthenticator")
            .field("tokens", &self.tokens)
            .field("lookup_timeout", &self.lookup_timeout)
            .finish()
    }
}

impl RequestAuthenticator {
    pub fn new(
        tokens: Arc<TokenService>,
        principals: Arc<dyn PrincipalLoader>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            tokens,
            principals,
            lookup_timeout,
        }
    }

    /// Never fails: every problem ends in `Unauthenticated`.
    pub async fn authenticate(&self, headers: &HeaderMap) -> AuthOutcome {
        let Some(token) = bearer_token(headers) else {
            return AuthOutcome::Unauthenticated;
        };

        let claims = match self.tokens.validate(token) {
            Ok(claims) => claims,
            Err(err) => {
                debug!(error = %err, "bearer token rejected");
                return AuthOutcome::Unauthenticated;
            }
        };

        // Own task so a loader panic comes back as a JoinError.
        let principals = self.principals.clone();
        let subject = claims.sub.clone();
        let mut lookup =
            tokio::spawn(async move { principals.load_by_subject(&subject).await });

        match tokio::time::timeout(self.lookup_timeout, &mut lookup).await {
            Ok(Ok(Ok(principal))) => AuthOutcome::Authenticated(principal),
            Ok(Ok(Err(PrincipalError::NotFound))) => {
                debug!(subject = %claims.sub, "token subject has no principal");
                AuthOutcome::Unauthenticated
            }
            Ok(Ok(Err(err))) => {
                warn!(subject = %claims.sub, error = %err, "principal lookup failed");
                AuthOutcome::Unauthenticated
            }
            Ok(Err(err)) => {
                warn!(
                    subject = %claims.sub,
                    panicked = err.is_panic(),
                    "principal lookup task did not complete"
                );
                AuthOutcome::Unauthenticated
            }
            Err(_) => {
                lookup.abort();
                warn!(
                    subject = %claims.sub,
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "principal lookup timed out"
                );
                AuthOutcome::Unauthenticated
            }
        }
    }
}

/// Token part of `Authorization: Bearer <token>`, if present and non-empty.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER_PREFIX)
        .filter(|token| !token.is_empty())
}
