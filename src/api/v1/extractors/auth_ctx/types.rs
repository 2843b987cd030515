/*
 * Responsibility
 * - Handler から見える「認証済みコンテキスト」の型
 * - middleware が認証に成功したときだけ request extensions に格納する
 */

use crate::services::auth::Principal;

/// 認証済みのリクエストに付与されるコンテキスト
///
/// - `user_id` は users.id
/// - `username` は token の subject と一致する
/// - `authorities` は今は常に空 (role 管理は未実装)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCtx {
    pub user_id: i64,
    pub username: String,
    pub authorities: Vec<String>,
}

impl From<Principal> for AuthCtx {
    fn from(principal: Principal) -> Self {
        Self {
            user_id: principal.user_id,
            username: principal.username,
            authorities: principal.authorities,
        }
    }
}
