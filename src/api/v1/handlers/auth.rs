/*
 * Responsibility
 * - POST /auth/register: username / email の重複チェック → password hash → 作成
 * - POST /auth/login: 資格情報の確認 → token 発行
 * - どちらも認証不要
 */
use axum::{Json, extract::State};
use tracing::info;

use crate::{
    api::v1::dto::{
        auth::{LoginRequest, RegisterRequest, TokenResponse},
        users::UserResponse,
    },
    error::AppError,
    repos::{
        error::{RepoError, UniqueKey},
        user_repo::NewUser,
    },
    state::AppState,
};

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<UserResponse>, AppError> {
    req.validate()
        .map_err(|msg| AppError::bad_request("VALIDATION_ERROR", msg))?;

    if state.users.find_by_username(&req.username).await?.is_some() {
        return Err(taken(UniqueKey::Username));
    }
    if state.users.find_by_email(&req.email).await?.is_some() {
        return Err(taken(UniqueKey::Email));
    }

    let password_hash = state.passwords.hash(&req.password).await?;
    let row = state
        .users
        .create(&NewUser {
            name: req.name,
            username: req.username,
            email: req.email,
            password_hash,
            phone: req.phone,
            website: req.website,
            address: req.address.into(),
            company: req.company.into(),
        })
        .await
        // A concurrent registration can win between the lookups and the insert.
        .map_err(|e| match e {
            RepoError::Conflict(key @ (UniqueKey::Username | UniqueKey::Email)) => taken(key),
            other => other.into(),
        })?;

    info!(user_id = row.id, "user registered");
    Ok(Json(row.into()))
}

fn taken(key: UniqueKey) -> AppError {
    match key {
        UniqueKey::Email => AppError::bad_request("EMAIL_IN_USE", "Email is already in use!"),
        _ => AppError::bad_request("USERNAME_TAKEN", "Username is already taken!"),
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    if !state
        .credentials
        .verify(&req.username, &req.password)
        .await?
    {
        return Err(AppError::Unauthorized);
    }

    let token = state.tokens.issue(&req.username)?;

    Ok(Json(TokenResponse::bearer(token, state.tokens.expiration())))
}
