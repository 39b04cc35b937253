use std::time::Duration;

use axum::http::{header::COOKIE, HeaderMap, HeaderValue};

pub const TOKEN_COOKIE: &str = "token";

/// Reads a cookie value from every `Cookie` header on the request.
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn token_cookie(token: &str, max_age: Duration, secure: bool) -> anyhow::Result<HeaderValue> {
    let mut value = format!(
        "{TOKEN_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        max_age.as_secs()
    );
    if secure {
        value.push_str("; Secure");
    }
    Ok(HeaderValue::from_str(&value)?)
}

pub fn clear_token_cookie(secure: bool) -> HeaderValue {
    if secure {
        HeaderValue::from_static("token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0; Secure")
    } else {
        HeaderValue::from_static("token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
    }
}
