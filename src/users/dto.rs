use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::repo_types::{AdminChanges, ProfileChanges, SessionUser};
use crate::{
    auth::services::{normalize_email, validate_password},
    error::{AppError, AppResult},
};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub role_id: Option<i32>,
}

/// Register payload after trimming and validation.
#[derive(Debug)]
pub struct ValidRegistration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role_id: Option<i32>,
}

impl RegisterRequest {
    pub fn validate(self) -> AppResult<ValidRegistration> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::bad_request("name is required"));
        }
        let email = normalize_email(&self.email)?;
        validate_password(&self.password)?;
        Ok(ValidRegistration {
            name,
            email,
            password: self.password,
            role_id: self.role_id,
        })
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct AdminUpdateRequest {
    pub role_id: Option<i32>,
    pub balance: Option<Decimal>,
    pub status: Option<String>,
}

impl AdminUpdateRequest {
    pub fn into_changes(self) -> AppResult<AdminChanges> {
        let status = match self.status {
            Some(s) if s.trim().is_empty() => {
                return Err(AppError::bad_request("status must not be empty"))
            }
            other => other.map(|s| s.trim().to_string()),
        };
        if self.role_id.is_none() && self.balance.is_none() && status.is_none() {
            return Err(AppError::bad_request("no fields were sent to update"));
        }
        if let Some(balance) = self.balance {
            check_balance(balance)?;
        }
        Ok(AdminChanges {
            role_id: self.role_id,
            balance: self.balance,
            status,
        })
    }
}

/// `balance` is stored as `NUMERIC(14, 2)`.
fn check_balance(balance: Decimal) -> AppResult<()> {
    if balance.normalize().scale() > 2 {
        return Err(AppError::bad_request("balance allows at most two decimal places"));
    }
    if balance.abs() > Decimal::new(99_999_999_999_999, 2) {
        return Err(AppError::bad_request("balance is out of range"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Default)]
pub struct ProfileUpdateRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl ProfileUpdateRequest {
    /// Blank fields count as absent.
    pub fn into_changes(self) -> AppResult<ProfileChanges> {
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let email = match self.email.filter(|e| !e.trim().is_empty()) {
            Some(e) => Some(normalize_email(&e)?),
            None => None,
        };
        if name.is_none() && email.is_none() {
            return Err(AppError::bad_request("no fields were provided to update"));
        }
        Ok(ProfileChanges { name, email })
    }
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope<T> {
    pub msg: &'static str,
    pub user: T,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub msg: &'static str,
    pub user: SessionUser,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub msg: &'static str,
}
