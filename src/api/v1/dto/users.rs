/*
 * Responsibility
 * - Users の request/response DTO (JSON は camelCase)
 * - validate() で形式チェック、repo 層の record との相互変換
 * - password / password_hash は response に出さない
 */
use serde::{Deserialize, Serialize};

use crate::repos::user_repo::{AddressRecord, CompanyRecord, UserRow};

const MAX_FIELD_LEN: usize = 255;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct GeoDto {
    pub lat: Option<String>,
    pub lng: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AddressDto {
    pub street: Option<String>,
    pub suite: Option<String>,
    pub city: Option<String>,
    pub zipcode: Option<String>,
    #[serde(default)]
    pub geo: GeoDto,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyDto {
    pub name: Option<String>,
    pub catch_phrase: Option<String>,
    pub bs: Option<String>,
}

impl From<AddressDto> for AddressRecord {
    fn from(a: AddressDto) -> Self {
        Self {
            street: a.street,
            suite: a.suite,
            city: a.city,
            zipcode: a.zipcode,
            geo_lat: a.geo.lat,
            geo_lng: a.geo.lng,
        }
    }
}

impl From<AddressRecord> for AddressDto {
    fn from(a: AddressRecord) -> Self {
        Self {
            street: a.street,
            suite: a.suite,
            city: a.city,
            zipcode: a.zipcode,
            geo: GeoDto {
                lat: a.geo_lat,
                lng: a.geo_lng,
            },
        }
    }
}

impl From<CompanyDto> for CompanyRecord {
    fn from(c: CompanyDto) -> Self {
        Self {
            name: c.name,
            catch_phrase: c.catch_phrase,
            bs: c.bs,
        }
    }
}

impl From<CompanyRecord> for CompanyDto {
    fn from(c: CompanyRecord) -> Self {
        Self {
            name: c.name,
            catch_phrase: c.catch_phrase,
            bs: c.bs,
        }
    }
}

fn check_required(value: &str, err: &'static str) -> Result<(), &'static str> {
    if value.trim().is_empty() || value.len() > MAX_FIELD_LEN {
        return Err(err);
    }
    Ok(())
}

fn check_email(email: &str) -> Result<(), &'static str> {
    check_required(email, "email is required")?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err("email is invalid"),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    #[serde(default)]
    pub address: AddressDto,
    #[serde(default)]
    pub company: CompanyDto,
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        check_required(&self.name, "name is required")?;
        check_required(&self.username, "username is required")?;
        check_email(&self.email)?;
        if self.password.is_empty() {
            return Err("password is required");
        }

        Ok(())
    }
}

/// Absent fields stay unchanged. `address` / `company` replace the whole group.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address: Option<AddressDto>,
    pub company: Option<CompanyDto>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if let Some(name) = &self.name {
            check_required(name, "name cannot be empty")?;
        }
        if let Some(username) = &self.username {
            check_required(username, "username cannot be empty")?;
        }
        if let Some(email) = &self.email {
            check_email(email)?;
        }
        if let Some(password) = &self.password
            && password.is_empty()
        {
            return Err("password cannot be empty");
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address: AddressDto,
    pub company: CompanyDto,
}

impl From<UserRow> for UserResponse {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            username: row.username,
            email: row.email,
            phone: row.phone,
            website: row.website,
            address: row.address.into(),
            company: row.company.into(),
        }
    }
}
