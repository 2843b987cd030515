//! Bearer token → AuthCtx を extensions に入れる (fail-open)
//!
//! - 認証できたときだけ `AuthCtx` を格納する
//! - 認証できなくてもここでは拒否しない。401 を返すのは `AuthCtxExtractor` 側
//! - 下流の handler は成否にかかわらず必ず 1 回だけ呼ばれる

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::api::v1::extractors::AuthCtx;
use crate::services::auth::AuthOutcome;
use crate::state::AppState;

/// `/api/v1/*` に認証コンテキストの付与を掛ける。
///
/// ```ignore
/// let v1 = api::v1::routes();
/// let v1 = middleware::auth::access::apply(v1, state.clone());
/// app = app.nest("/api/v1", v1);
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let AuthOutcome::Authenticated(principal) =
        state.authenticator.authenticate(req.headers()).await
    {
        req.extensions_mut().insert(AuthCtx::from(principal));
    }

    next.run(req).await
}
