//! In-memory fakes shared by unit tests.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::{TimeDelta, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tower::ServiceExt;

use crate::repos::error::{RepoError, RepoResult, UniqueKey};
use crate::repos::user_repo::{
    AddressRecord, CompanyRecord, NewUser, UserChanges, UserRepo, UserRow,
};
use crate::services::auth::clock::SystemClock;
use crate::services::auth::{
    PrincipalLoader, RepoCredentialVerifier, RepoPrincipalLoader, RequestAuthenticator,
    TokenService,
};
use crate::services::password::PasswordHasher;
use crate::state::AppState;

pub const TEST_SECRET: &[u8] = b"test-secret-key-for-jwt-token-generation-and-validation";

/// `UserRepo` backed by a Vec, enforcing the same unique keys as the table.
#[derive(Default)]
pub struct InMemoryUserRepo {
    rows: Mutex<Vec<UserRow>>,
    next_id: AtomicI64,
    fail_next: AtomicBool,
    blind_lookups: AtomicBool,
}

impl InMemoryUserRepo {
    /// Make the next username lookup fail with a db error.
    pub fn fail_next_lookup(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Username/email lookups return nothing from now on, as if another
    /// request inserted the row between a lookup and the insert.
    pub fn hide_rows_from_lookups(&self) {
        self.blind_lookups.store(true, Ordering::SeqCst);
    }

    fn blind(&self) -> bool {
        self.blind_lookups.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> RepoResult<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(RepoError::Db(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

fn clash(rows: &[UserRow], id: Option<i64>, username: &str, email: &str) -> Option<UniqueKey> {
    let others = || rows.iter().filter(move |r| Some(r.id) != id);
    if others().any(|r| r.username == username) {
        Some(UniqueKey::Username)
    } else if others().any(|r| r.email == email) {
        Some(UniqueKey::Email)
    } else {
        None
    }
}

#[async_trait]
impl UserRepo for InMemoryUserRepo {
    async fn list(&self) -> RepoResult<Vec<UserRow>> {
        Ok(self.rows.lock().await.clone())
    }

    async fn get(&self, id: i64) -> RepoResult<Option<UserRow>> {
        Ok(self.rows.lock().await.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> RepoResult<Option<UserRow>> {
        self.take_failure()?;
        if self.blind() {
            return Ok(None);
        }
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|r| r.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<UserRow>> {
        if self.blind() {
            return Ok(None);
        }
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|r| r.email == email)
            .cloned())
    }

    async fn create(&self, user: &NewUser) -> RepoResult<UserRow> {
        let mut rows = self.rows.lock().await;
        if let Some(key) = clash(&rows, None, &user.username, &user.email) {
            return Err(RepoError::Conflict(key));
        }

        let now = Utc::now();
        let row = UserRow {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            name: user.name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            phone: user.phone.clone(),
            website: user.website.clone(),
            address: user.address.clone(),
            company: user.company.clone(),
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, id: i64, changes: &UserChanges) -> RepoResult<Option<UserRow>> {
        let mut rows = self.rows.lock().await;
        let Some(current) = rows.iter().find(|r| r.id == id).cloned() else {
            return Ok(None);
        };

        let username = changes.username.as_ref().unwrap_or(&current.username);
        let email = changes.email.as_ref().unwrap_or(&current.email);
        if let Some(key) = clash(&rows, Some(id), username, email) {
            return Err(RepoError::Conflict(key));
        }

        let row = rows.iter_mut().find(|r| r.id == id).expect("row exists");
        if let Some(v) = &changes.name {
            row.name = v.clone();
        }
        if let Some(v) = &changes.username {
            row.username = v.clone();
        }
        if let Some(v) = &changes.email {
            row.email = v.clone();
        }
        if let Some(v) = &changes.password_hash {
            row.password_hash = v.clone();
        }
        if let Some(v) = &changes.phone {
            row.phone = Some(v.clone());
        }
        if let Some(v) = &changes.website {
            row.website = Some(v.clone());
        }
        if let Some(v) = &changes.address {
            row.address = v.clone();
        }
        if let Some(v) = &changes.company {
            row.company = v.clone();
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|r| r.id != id);
        Ok(rows.len() < before)
    }
}

pub fn sample_new_user(username: &str) -> NewUser {
    NewUser {
        name: format!("{username} name"),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: "not-a-real-hash".to_string(),
        phone: None,
        website: None,
        address: AddressRecord::default(),
        company: CompanyRecord::default(),
    }
}

pub fn test_tokens() -> Arc<TokenService> {
    Arc::new(TokenService::new(
        TEST_SECRET,
        TimeDelta::hours(1),
        Arc::new(SystemClock),
    ))
}

/// AppState wired the same way as production, over an in-memory repo.
pub fn test_state(users: Arc<InMemoryUserRepo>) -> AppState {
    let principals = Arc::new(RepoPrincipalLoader::new(users.clone()));
    test_state_with_loader(users, principals)
}

pub fn test_state_with_loader(
    users: Arc<InMemoryUserRepo>,
    principals: Arc<dyn PrincipalLoader>,
) -> AppState {
    let tokens = test_tokens();
    let passwords = PasswordHasher::default();
    let authenticator = Arc::new(RequestAuthenticator::new(
        tokens.clone(),
        principals,
        Duration::from_millis(200),
    ));
    let credentials = Arc::new(RepoCredentialVerifier::new(users.clone(), passwords.clone()));

    AppState::new(users, tokens, authenticator, credentials, passwords)
}

/// One request through `app`. Empty bodies decode as `Value::Null`.
pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(json) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();

    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}
