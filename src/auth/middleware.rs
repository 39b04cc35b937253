use axum::{
    extract::{FromRef, Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use super::{
    cookie::{get_cookie, TOKEN_COOKIE},
    extractors::CurrentUser,
    jwt::JwtKeys,
};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
    users::repo,
};

/// `exp` of the token that authenticated the request, in unix seconds.
#[derive(Debug, Clone, Copy)]
pub struct TokenExpiry(pub usize);

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> AppResult<Response> {
    let token = get_cookie(req.headers(), TOKEN_COOKIE)
        .ok_or_else(|| AppError::unauthorized("token not provided"))?;

    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify(&token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        AppError::unauthorized("invalid or expired token")
    })?;

    let user = repo::find_session_user(&state.db, claims.sub)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %claims.sub, "token for unknown user");
            AppError::not_found("user not found")
        })?;

    debug!(user_id = %user.id, role_id = user.role_id, "request authenticated");
    req.extensions_mut().insert(user);
    req.extensions_mut().insert(TokenExpiry(claims.exp));
    Ok(next.run(req).await)
}

pub async fn require_admin(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    req: Request,
    next: Next,
) -> AppResult<Response> {
    if user.role_id != state.config.admin_role_id {
        warn!(user_id = %user.id, role_id = user.role_id, "admin route refused");
        return Err(AppError::forbidden(
            "access denied: only administrators can perform this action",
        ));
    }
    Ok(next.run(req).await)
}
