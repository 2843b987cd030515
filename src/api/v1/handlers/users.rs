/*
 * Responsibility
 * - /users 系 CRUD handler (全て認証必須: AuthCtxExtractor)
 * - Path/Json を extractor で受け、DTO validation → repo 呼び出し
 * - password は受け取った時点で hash し、平文は repo に渡さない
 */
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::info;

use crate::{
    api::v1::{
        dto::users::{CreateUserRequest, UpdateUserRequest, UserResponse},
        extractors::AuthCtxExtractor,
    },
    error::AppError,
    repos::user_repo::{NewUser, UserChanges},
    state::AppState,
};

pub async fn list_users(
    State(state): State<AppState>,
    AuthCtxExtractor(_ctx): AuthCtxExtractor,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let rows = state.users.list().await?;

    Ok(Json(rows.into_iter().map(UserResponse::from).collect()))
}

pub async fn me(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
) -> Result<Json<UserResponse>, AppError> {
    let row = state
        .users
        .get(ctx.user_id)
        .await?
        .ok_or(AppError::not_found("User"))?;

    Ok(Json(row.into()))
}

pub async fn create_user(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    req.validate()
        .map_err(|msg| AppError::bad_request("VALIDATION_ERROR", msg))?;

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
        .await?;

    info!(user_id = row.id, by = %ctx.username, "user created");
    Ok(Json(row.into()))
}

pub async fn get_user(
    State(state): State<AppState>,
    AuthCtxExtractor(_ctx): AuthCtxExtractor,
    Path(user_id): Path<i64>,
) -> Result<Json<UserResponse>, AppError> {
    let row = state
        .users
        .get(user_id)
        .await?
        .ok_or(AppError::not_found("User"))?;

    Ok(Json(row.into()))
}

pub async fn update_user(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    Path(user_id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    req.validate()
        .map_err(|msg| AppError::bad_request("VALIDATION_ERROR", msg))?;

    let password_hash = match &req.password {
        Some(raw) => Some(state.passwords.hash(raw).await?),
        None => None,
    };

    let changes = UserChanges {
        name: req.name,
        username: req.username,
        email: req.email,
        password_hash,
        phone: req.phone,
        website: req.website,
        address: req.address.map(Into::into),
        company: req.company.map(Into::into),
    };

    let row = state
        .users
        .update(user_id, &changes)
        .await?
        .ok_or(AppError::not_found("User"))?;

    info!(user_id, by = %ctx.username, "user updated");
    Ok(Json(row.into()))
}

pub async fn delete_user(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if !state.users.delete(user_id).await? {
        return Err(AppError::not_found("User"));
    }

    info!(user_id, by = %ctx.username, "user deleted");
    Ok(StatusCode::OK)
}
