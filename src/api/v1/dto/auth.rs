use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use super::users::CreateUserRequest;

/// Registration takes the same body as `POST /users`.
pub type RegisterRequest = CreateUserRequest;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub token_type: &'static str,
    /// seconds, rounded up so a client never refreshes too late
    pub expires_in: i64,
}

impl TokenResponse {
    pub fn bearer(token: String, lifetime: TimeDelta) -> Self {
        let ms = lifetime.num_milliseconds();
        Self {
            token,
            token_type: "Bearer",
            expires_in: ms / 1000 + i64::from(ms % 1000 > 0),
        }
    }
}
