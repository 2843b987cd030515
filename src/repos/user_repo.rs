/*
 * Responsibility
 * - users テーブル向け SQLx 操作
 * - UserRepo trait を境界にして、handler / auth からは trait だけを見る
 * - username / email の一意制約違反は RepoError::Conflict に変換する
 */
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::repos::error::{RepoError, RepoResult};

macro_rules! user_columns {
    () => {
        r#"
            id, name, username, email, password_hash, phone, website,
            address_street, address_suite, address_city, address_zipcode,
            address_geo_lat, address_geo_lng,
            company_name, company_catch_phrase, company_bs,
            created_at, updated_at
        "#
    };
}

#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow)]
pub struct AddressRecord {
    #[sqlx(rename = "address_street")]
    pub street: Option<String>,
    #[sqlx(rename = "address_suite")]
    pub suite: Option<String>,
    #[sqlx(rename = "address_city")]
    pub city: Option<String>,
    #[sqlx(rename = "address_zipcode")]
    pub zipcode: Option<String>,
    #[sqlx(rename = "address_geo_lat")]
    pub geo_lat: Option<String>,
    #[sqlx(rename = "address_geo_lng")]
    pub geo_lng: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow)]
pub struct CompanyRecord {
    #[sqlx(rename = "company_name")]
    pub name: Option<String>,
    #[sqlx(rename = "company_catch_phrase")]
    pub catch_phrase: Option<String>,
    #[sqlx(rename = "company_bs")]
    pub bs: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    #[sqlx(flatten)]
    pub address: AddressRecord,
    #[sqlx(flatten)]
    pub company: CompanyRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address: AddressRecord,
    pub company: CompanyRecord,
}

/// Partial update. `None` leaves the column as is.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    // Replaces every address/company column when present.
    pub address: Option<AddressRecord>,
    pub company: Option<CompanyRecord>,
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn list(&self) -> RepoResult<Vec<UserRow>>;
    async fn get(&self, id: i64) -> RepoResult<Option<UserRow>>;
    async fn find_by_username(&self, username: &str) -> RepoResult<Option<UserRow>>;
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<UserRow>>;
    async fn create(&self, user: &NewUser) -> RepoResult<UserRow>;
    async fn update(&self, id: i64, changes: &UserChanges) -> RepoResult<Option<UserRow>>;
    async fn delete(&self, id: i64) -> RepoResult<bool>;
}

#[derive(Clone, Debug)]
pub struct PgUserRepo {
    pool: PgPool,
}

impl PgUserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn list(&self) -> RepoResult<Vec<UserRow>> {
        let rows = sqlx::query_as::<_, UserRow>(concat!(
            "SELECT",
            user_columns!(),
            "FROM users ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn get(&self, id: i64) -> RepoResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "SELECT",
            user_columns!(),
            "FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_by_username(&self, username: &str) -> RepoResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "SELECT",
            user_columns!(),
            "FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "SELECT",
            user_columns!(),
            "FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn create(&self, user: &NewUser) -> RepoResult<UserRow> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            r#"
            INSERT INTO users (
                name, username, email, password_hash, phone, website,
                address_street, address_suite, address_city, address_zipcode,
                address_geo_lat, address_geo_lng,
                company_name, company_catch_phrase, company_bs
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING
            "#,
            user_columns!()
        ))
        .bind(&user.name)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.phone.as_deref())
        .bind(user.website.as_deref())
        .bind(user.address.street.as_deref())
        .bind(user.address.suite.as_deref())
        .bind(user.address.city.as_deref())
        .bind(user.address.zipcode.as_deref())
        .bind(user.address.geo_lat.as_deref())
        .bind(user.address.geo_lng.as_deref())
        .bind(user.company.name.as_deref())
        .bind(user.company.catch_phrase.as_deref())
        .bind(user.company.bs.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)?;

        Ok(row)
    }

    async fn update(&self, id: i64, changes: &UserChanges) -> RepoResult<Option<UserRow>> {
        // $8 / $15: whether to overwrite the address / company column group
        let address = changes.address.as_ref();
        let company = changes.company.as_ref();

        let row = sqlx::query_as::<_, UserRow>(concat!(
            r#"
            UPDATE users
            SET
                name = COALESCE($2, name),
                username = COALESCE($3, username),
                email = COALESCE($4, email),
                password_hash = COALESCE($5, password_hash),
                phone = COALESCE($6, phone),
                website = COALESCE($7, website),
                address_street = CASE WHEN $8 = false THEN address_street ELSE $9 END,
                address_suite = CASE WHEN $8 = false THEN address_suite ELSE $10 END,
                address_city = CASE WHEN $8 = false THEN address_city ELSE $11 END,
                address_zipcode = CASE WHEN $8 = false THEN address_zipcode ELSE $12 END,
                address_geo_lat = CASE WHEN $8 = false THEN address_geo_lat ELSE $13 END,
                address_geo_lng = CASE WHEN $8 = false THEN address_geo_lng ELSE $14 END,
                company_name = CASE WHEN $15 = false THEN company_name ELSE $16 END,
                company_catch_phrase = CASE WHEN $15 = false THEN company_catch_phrase ELSE $17 END,
                company_bs = CASE WHEN $15 = false THEN company_bs ELSE $18 END,
                updated_at = now()
            WHERE id = $1
            RETURNING
            "#,
            user_columns!()
        ))
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.username.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.password_hash.as_deref())
        .bind(changes.phone.as_deref())
        .bind(changes.website.as_deref())
        .bind(address.is_some())
        .bind(address.and_then(|a| a.street.as_deref()))
        .bind(address.and_then(|a| a.suite.as_deref()))
        .bind(address.and_then(|a| a.city.as_deref()))
        .bind(address.and_then(|a| a.zipcode.as_deref()))
        .bind(address.and_then(|a| a.geo_lat.as_deref()))
        .bind(address.and_then(|a| a.geo_lng.as_deref()))
        .bind(company.is_some())
        .bind(company.and_then(|c| c.name.as_deref()))
        .bind(company.and_then(|c| c.catch_phrase.as_deref()))
        .bind(company.and_then(|c| c.bs.as_deref()))
        .fetch_optional(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)?;

        Ok(row)
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
