use axum::{
    extract::{FromRef, Request, State},
    http::{header::SET_COOKIE, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    cookie::{clear_token_cookie, token_cookie},
    extractors::CurrentUser,
    jwt::JwtKeys,
    middleware::TokenExpiry,
};
use crate::{error::AppResult, state::AppState, users::repo};

/// A session with no recorded activity counts as active.
pub fn is_idle(
    last_activity: Option<OffsetDateTime>,
    now: OffsetDateTime,
    idle: TimeDuration,
) -> bool {
    last_activity.is_some_and(|at| now - at > idle)
}

pub fn needs_renewal(exp: usize, now: OffsetDateTime, threshold_seconds: i64) -> bool {
    (exp as i64) - now.unix_timestamp() < threshold_seconds
}

/// Runs after `require_auth`: enforces the idle window, stamps activity and
/// reissues the cookie when the token is about to expire.
pub async fn session_guard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    req: Request,
    next: Next,
) -> AppResult<Response> {
    let cfg = &state.config;
    let now = OffsetDateTime::now_utc();

    if is_idle(
        user.last_activity,
        now,
        TimeDuration::minutes(cfg.session_idle_minutes),
    ) {
        warn!(user_id = %user.id, "session expired due to inactivity");
        return Ok((
            StatusCode::UNAUTHORIZED,
            [(SET_COOKIE, clear_token_cookie(cfg.cookie_secure))],
            Json(json!({ "msg": "session expired due to inactivity" })),
        )
            .into_response());
    }

    repo::touch_activity(&state.db, user.id).await?;

    let renewed = match req.extensions().get::<TokenExpiry>() {
        Some(TokenExpiry(exp)) if needs_renewal(*exp, now, cfg.jwt.renew_threshold_seconds) => {
            renew_cookie(&state, user.id)
        }
        _ => None,
    };

    let mut resp = next.run(req).await;
    if let Some(cookie) = renewed {
        resp.headers_mut().append(SET_COOKIE, cookie);
    }
    Ok(resp)
}

fn renew_cookie(state: &AppState, user_id: Uuid) -> Option<HeaderValue> {
    let keys = JwtKeys::from_ref(state);
    let cookie = keys
        .sign_renewed(user_id)
        .and_then(|token| token_cookie(&token, keys.renewed_ttl, state.config.cookie_secure));
    match cookie {
        Ok(c) => {
            debug!(user_id = %user_id, "session token renewed");
            Some(c)
        }
        Err(e) => {
            warn!(error = %e, user_id = %user_id, "token renewal failed");
            None
        }
    }
}
