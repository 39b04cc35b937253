use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Minimal row used by the verification and reset flows.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub verified: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct LoginUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub verified: bool,
    pub role_id: i32,
    pub role_name: String,
}

/// The authenticated user attached to a request by the auth middleware.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SessionUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role_id: i32,
    pub role_name: String,
    #[serde(skip_serializing)]
    pub last_activity: Option<OffsetDateTime>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub balance: Decimal,
    pub status: String,
    pub role: String,
}

#[derive(Debug, Serialize, FromRow)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role_id: i32,
}

#[derive(Debug, Serialize, FromRow)]
pub struct ManagedUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role_id: i32,
    pub balance: Decimal,
    pub status: String,
}

#[derive(Debug, Serialize, FromRow)]
pub struct UserRole {
    pub name: String,
    pub email: String,
    pub role_id: i32,
    pub role_name: String,
}

pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role_id: i32,
    pub verification_token: &'a str,
    pub verification_expires_at: OffsetDateTime,
}

#[derive(Debug, Default)]
pub struct AdminChanges {
    pub role_id: Option<i32>,
    pub balance: Option<Decimal>,
    pub status: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub email: Option<String>,
}
