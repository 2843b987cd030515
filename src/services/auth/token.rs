/*
 * Responsibility
 * - セッショントークン (JWT / HS256) の発行と検証
 * - 署名鍵 (secret) を持つのはこのサービスだけ
 * - 期限判定は Clock 経由で行う (leeway なし、expiresAt ちょうどで失効)
 */
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::services::auth::clock::Clock;

/// HS256 needs at least as many key bytes as the digest output.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("subject must not be empty")]
    EmptySubject,
    #[error("malformed token")]
    Malformed,
    #[error("token signature does not match")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("failed to sign token")]
    Signing,
}

/// Claims carried inside a session token.
///
/// `iat` / `exp` are NumericDate (whole seconds) for other JWT readers; `exp`
/// is rounded up so it never ends before the real instant. `exp_ms` is the
/// exact expiry in epoch milliseconds and is the one checked here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub exp_ms: i64,
}

impl TokenClaims {
    fn new(sub: &str, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        let exp_ms = expires_at.timestamp_millis();
        let exp = exp_ms.div_euclid(1000) + i64::from(exp_ms.rem_euclid(1000) > 0);

        Self {
            sub: sub.to_string(),
            iat: issued_at.timestamp(),
            exp,
            exp_ms,
        }
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.exp_ms)
    }
}

/// Issues and verifies signed, expiring session tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiration: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("TokenService")
            .field("expiration", &self.expiration)
            .finish()
    }
}

impl TokenService {
    pub fn new(secret: &[u8], expiration: TimeDelta, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // exp is checked against our own clock in `validate`, with millisecond precision.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        // exp_ms is required by TokenClaims itself; a token without it is Malformed.

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            expiration,
            clock,
        }
    }

    pub fn expiration(&self) -> TimeDelta {
        self.expiration
    }

    /// Issue a token for `subject`, valid for the configured duration from now.
    pub fn issue(&self, subject: &str) -> Result<String, TokenError> {
        if subject.is_empty() {
            return Err(TokenError::EmptySubject);
        }

        let now = self.clock.now();
        let claims = TokenClaims::new(subject, now, now + self.expiration);

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(
            |e| {
                error!(error = %e, "failed to sign session token");
                TokenError::Signing
            },
        )
    }

    /// Verify the signature and return the subject. Expiry is not checked.
    pub fn parse_subject(&self, token: &str) -> Result<String, TokenError> {
        self.decode(token).map(|claims| claims.sub)
    }

    /// Verify the signature and expiry, returning the claims.
    pub fn validate(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let claims = self.decode(token)?;
        if self.is_expired(&claims) {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    /// `true` only for a well-formed, correctly signed, unexpired token.
    pub fn is_valid(&self, token: &str) -> bool {
        self.validate(token).is_ok()
    }

    pub fn is_expired(&self, claims: &TokenClaims) -> bool {
        self.clock.now().timestamp_millis() >= claims.exp_ms
    }

    fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed,
            })
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    use super::*;
    use crate::services::auth::clock::{ManualClock, SystemClock};

    const SECRET: &[u8] = b"test-secret-key-for-jwt-token-generation-and-validation";
    const OTHER_SECRET: &[u8] = b"another-secret-key-that-is-also-long-enough!!";

    fn epoch() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn service_at(clock: Arc<ManualClock>, expiration: TimeDelta) -> TokenService {
        TokenService::new(SECRET, expiration, clock)
    }

    fn one_hour_service() -> (TokenService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at(epoch()));
        (service_at(clock.clone(), TimeDelta::hours(1)), clock)
    }

    fn flip(token: &str, index: usize) -> String {
        let mut chars: Vec<char> = token.chars().collect();
        chars[index] = if chars[index] == 'A' { 'Q' } else { 'A' };
        chars.into_iter().collect()
    }

    #[test]
    fn issued_token_has_three_segments() {
        let (svc, _) = one_hour_service();
        let token = svc.issue("testuser").unwrap();

        assert_eq!(token.split('.').count(), 3);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        );
    }

    #[test]
    fn parse_subject_returns_issued_subject() {
        let (svc, _) = one_hour_service();
        for subject in ["testuser", "alice", "a", " ", "ユーザー", "user@example.com"] {
            let token = svc.issue(subject).unwrap();
            assert_eq!(svc.parse_subject(&token).unwrap(), subject);
        }
    }

    #[test]
    fn issue_rejects_empty_subject() {
        let (svc, _) = one_hour_service();
        assert_eq!(svc.issue(""), Err(TokenError::EmptySubject));
    }

    #[test]
    fn claims_carry_issue_and_expiry_instants() {
        let (svc, _) = one_hour_service();
        let token = svc.issue("alice").unwrap();
        let claims = svc.validate(&token).unwrap();

        assert_eq!(claims.issued_at(), Some(epoch()));
        assert_eq!(claims.expires_at(), Some(epoch() + TimeDelta::hours(1)));
    }

    #[test]
    fn same_instant_yields_same_token() {
        let (svc, clock) = one_hour_service();
        let first = svc.issue("alice").unwrap();
        assert_eq!(svc.issue("alice").unwrap(), first);

        clock.advance(TimeDelta::seconds(1));
        assert_ne!(svc.issue("alice").unwrap(), first);
    }

    #[test]
    fn fresh_token_is_valid() {
        let (svc, _) = one_hour_service();
        let token = svc.issue("testuser").unwrap();
        assert!(svc.is_valid(&token));
    }

    #[test]
    fn alice_token_expires_after_an_hour() {
        let (svc, clock) = one_hour_service();
        let token = svc.issue("alice").unwrap();
        assert!(svc.is_valid(&token));

        clock.advance(TimeDelta::minutes(61));
        assert!(!svc.is_valid(&token));
        assert_eq!(svc.validate(&token), Err(TokenError::Expired));
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let (svc, clock) = one_hour_service();
        let token = svc.issue("alice").unwrap();
        let expires_at = epoch() + TimeDelta::hours(1);

        clock.set(expires_at - TimeDelta::milliseconds(1));
        assert!(svc.is_valid(&token));

        clock.set(expires_at);
        assert!(!svc.is_valid(&token));

        clock.set(expires_at + TimeDelta::milliseconds(1));
        assert!(!svc.is_valid(&token));
    }

    #[test]
    fn sub_second_issue_instant_keeps_full_lifetime() {
        let issued = epoch() + TimeDelta::milliseconds(900);
        let clock = Arc::new(ManualClock::at(issued));
        let svc = service_at(clock.clone(), TimeDelta::hours(1));
        let token = svc.issue("alice").unwrap();
        let expires_at = issued + TimeDelta::hours(1);

        assert_eq!(svc.validate(&token).unwrap().expires_at(), Some(expires_at));

        clock.set(expires_at - TimeDelta::milliseconds(500));
        assert!(svc.is_valid(&token));
        clock.set(expires_at - TimeDelta::milliseconds(1));
        assert!(svc.is_valid(&token));
        clock.set(expires_at);
        assert!(!svc.is_valid(&token));
    }

    #[test]
    fn sub_second_lifetime_is_valid_until_it_lapses() {
        let issued = epoch() + TimeDelta::milliseconds(500);
        let clock = Arc::new(ManualClock::at(issued));
        let svc = service_at(clock.clone(), TimeDelta::milliseconds(400));
        let token = svc.issue("testuser").unwrap();

        assert!(svc.is_valid(&token));
        clock.set(issued + TimeDelta::milliseconds(399));
        assert!(svc.is_valid(&token));
        clock.set(issued + TimeDelta::milliseconds(400));
        assert!(!svc.is_valid(&token));
    }

    #[test]
    fn numeric_date_expiry_is_rounded_up() {
        let issued = epoch() + TimeDelta::milliseconds(900);
        let svc = service_at(Arc::new(ManualClock::at(issued)), TimeDelta::hours(1));
        let claims = svc.validate(&svc.issue("alice").unwrap()).unwrap();

        assert_eq!(claims.iat, 1_700_000_000);
        assert_eq!(claims.exp, 1_700_003_601);
        assert_eq!(claims.exp_ms, 1_700_003_600_900);
    }

    #[test]
    fn millisecond_expiration_lapses_on_the_system_clock() {
        let svc = TokenService::new(SECRET, TimeDelta::milliseconds(1), Arc::new(SystemClock));
        let token = svc.issue("testuser").unwrap();

        std::thread::sleep(std::time::Duration::from_millis(10));

        assert!(!svc.is_valid(&token));
    }

    #[test]
    fn parse_subject_ignores_expiry() {
        let (svc, clock) = one_hour_service();
        let token = svc.issue("alice").unwrap();
        clock.advance(TimeDelta::days(2));

        assert!(!svc.is_valid(&token));
        assert_eq!(svc.parse_subject(&token).unwrap(), "alice");
    }

    #[test]
    fn appended_text_invalidates_token() {
        let (svc, _) = one_hour_service();
        let token = svc.issue("testuser").unwrap();
        assert!(!svc.is_valid(&format!("{token}modified")));
    }

    #[test]
    fn truncation_invalidates_token() {
        let (svc, _) = one_hour_service();
        let token = svc.issue("testuser").unwrap();

        assert!(!svc.is_valid(&token[..token.len() - 1]));
        assert!(!svc.is_valid(&token[..token.len() / 2]));
        assert!(!svc.is_valid(""));
    }

    #[test]
    fn any_flipped_character_invalidates_token() {
        let (svc, _) = one_hour_service();
        let token = svc.issue("testuser").unwrap();

        for i in 0..token.len() {
            let tampered = flip(&token, i);
            assert!(!svc.is_valid(&tampered), "flip at {i} still valid");
        }
    }

    #[test]
    fn modified_final_character_is_rejected_by_both_paths() {
        let (svc, _) = one_hour_service();
        let token = svc.issue("testuser").unwrap();
        let tampered = flip(&token, token.len() - 1);

        assert!(!svc.is_valid(&tampered));
        let err = svc.parse_subject(&tampered).unwrap_err();
        assert!(matches!(err, TokenError::BadSignature | TokenError::Malformed));
    }

    #[test]
    fn rewritten_payload_fails_signature_check() {
        let (svc, _) = one_hour_service();
        let token = svc.issue("alice").unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let payload = URL_SAFE_NO_PAD.decode(parts[1]).unwrap();
        let payload = String::from_utf8(payload).unwrap().replace("alice", "bobby");
        let forged = format!(
            "{}.{}.{}",
            parts[0],
            URL_SAFE_NO_PAD.encode(payload),
            parts[2]
        );

        assert_eq!(svc.parse_subject(&forged), Err(TokenError::BadSignature));
        assert!(!svc.is_valid(&forged));
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let clock = Arc::new(ManualClock::at(epoch()));
        let issuer = TokenService::new(OTHER_SECRET, TimeDelta::hours(1), clock.clone());
        let verifier = service_at(clock, TimeDelta::hours(1));

        let token = issuer.issue("alice").unwrap();

        assert!(issuer.is_valid(&token));
        assert!(!verifier.is_valid(&token));
        assert_eq!(verifier.parse_subject(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        let (svc, _) = one_hour_service();
        for garbage in ["invalid.token.string", "", "abc", "a.b", "a.b.c.d", "...."] {
            assert!(!svc.is_valid(garbage));
            assert_eq!(svc.parse_subject(garbage), Err(TokenError::Malformed), "{garbage}");
        }
    }

    #[test]
    fn debug_output_hides_key_material() {
        let (svc, _) = one_hour_service();
        let printed = format!("{svc:?}");
        assert!(!printed.contains("test-secret"));
    }
}
