use lazy_static::lazy_static;
use rand::RngCore;
use regex::Regex;
use time::{Duration as TimeDuration, OffsetDateTime};

use crate::error::{AppError, AppResult};

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trims and lowercases, rejecting anything that does not look like an address.
pub fn normalize_email(raw: &str) -> AppResult<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::bad_request("email is required"));
    }
    if !is_valid_email(&email) {
        return Err(AppError::bad_request("invalid email"));
    }
    Ok(email)
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.is_empty() {
        return Err(AppError::bad_request("password is required"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// 32 random bytes, hex encoded. Used for verification and reset links.
pub fn generate_token() -> String {
    let mut buf = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

pub fn expires_in(minutes: i64) -> OffsetDateTime {
    OffsetDateTime::now_utc() + TimeDuration::minutes(minutes)
}
