/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /health, /auth は公開、/users は handler 側の AuthCtxExtractor で保護
 * - AuthCtx の付与は app 側で access::apply を掛ける
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use crate::api::v1::handlers::{
    auth::{login, register},
    health::health,
    users::{create_user, delete_user, get_user, list_users, me, update_user},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/users", get(list_users).post(create_user))
        .route("/users/me", get(me))
        .route(
            "/users/{user_id}",
            get(get_user).put(update_user).delete(delete_user),
        )
}
