/*
 * Responsibility
 * - tracing / panic hook の初期化
 * - Config 読み込み → DB 接続・migration → 依存生成 → Router 組み立て
 * - Middleware の適用 (auth / security headers / CORS / HTTP 共通層)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    api,
    config::Config,
    middleware,
    repos::user_repo::{PgUserRepo, UserRepo},
    services::{
        auth::{RepoCredentialVerifier, build_authenticator, build_token_service},
        password::PasswordHasher,
    },
    state::AppState,
};

fn init_tracing() {
    // RUST_LOG=info,user_api=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // development: fail fast. production: default hook, server keeps running.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(?config, "starting API in {:?} mode on {}", config.app_env, config.addr);

    let state = build_state(&config).await?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_state(config: &Config) -> Result<AppState> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    let users: Arc<dyn UserRepo> = Arc::new(PgUserRepo::new(pool));
    let passwords = PasswordHasher::default();
    let tokens = build_token_service(config);
    let authenticator = build_authenticator(config, tokens.clone(), users.clone());
    let credentials = Arc::new(RepoCredentialVerifier::new(
        users.clone(),
        passwords.clone(),
    ));

    Ok(AppState::new(
        users,
        tokens,
        authenticator,
        credentials,
        passwords,
    ))
}

/// `/api/v1` with AuthCtx attached. No transport layers.
pub fn build_api(state: AppState) -> Router {
    let v1 = middleware::auth::access::apply(api::v1::routes(), state.clone());

    Router::new().nest("/api/v1", v1).with_state(state)
}

fn build_router(state: AppState, config: &Config) -> Router {
    let router = build_api(state);
    let router = middleware::security_headers::apply(router);
    let router = middleware::cors::apply(router, config);

    // outermost: request id / trace see every response, including CORS preflight
    middleware::http::apply(router, config)
}
