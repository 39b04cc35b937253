use axum::{
    extract::{FromRef, State},
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::{
    cookie::{clear_token_cookie, token_cookie},
    dto::{
        ActivityResponse, EmailRequest, LoginRequest, LoginResponse, MessageResponse,
        ResetPasswordRequest,
    },
    jwt::JwtKeys,
    password::{hash_password, verify_password},
    services::{expires_in, generate_token, normalize_email, validate_password},
};
use crate::{
    error::{AppError, AppResult},
    extract::{JsonBody, PathParam},
    mail::templates,
    state::AppState,
    users::repo,
};

/// Routes reachable without a session.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/verify/resend", post(resend_verification))
        .route("/verify/:token", get(verify_account))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password/:token", post(reset_password))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let email = normalize_email(&payload.email)?;
    if payload.password.is_empty() {
        return Err(AppError::bad_request("password is required"));
    }

    let user = repo::find_for_login(&state.db, &email)
        .await?
        .ok_or_else(|| {
            warn!(email = %email, "login unknown email");
            AppError::not_found("user does not exist")
        })?;

    if !verify_password(payload.password, user.password_hash).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::unauthorized("incorrect password"));
    }

    if !user.verified {
        warn!(user_id = %user.id, "login on unverified account");
        return Err(AppError::forbidden(
            "your account is not verified, check your email to activate it",
        ));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_session(user.id)?;
    let cookie = token_cookie(&token, keys.session_ttl, state.config.cookie_secure)?;

    // The idle clock starts at login.
    repo::touch_activity(&state.db, user.id).await?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(LoginResponse {
            msg: "logged in successfully",
            id: user.id,
            name: user.name,
            email: user.email,
            role_id: user.role_id,
            role_name: user.role_name,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        AppendHeaders([(SET_COOKIE, clear_token_cookie(state.config.cookie_secure))]),
        Json(MessageResponse {
            msg: "logged out successfully",
        }),
    )
}

#[instrument(skip(state, token))]
pub async fn verify_account(
    State(state): State<AppState>,
    PathParam(token): PathParam<String>,
) -> AppResult<Json<MessageResponse>> {
    let user_id = repo::verify_by_token(&state.db, &token)
        .await?
        .ok_or_else(|| AppError::bad_request("invalid or expired token"))?;

    info!(user_id = %user_id, "account verified");
    Ok(Json(MessageResponse {
        msg: "account verified successfully",
    }))
}

#[instrument(skip(state, payload))]
pub async fn resend_verification(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<EmailRequest>,
) -> AppResult<Json<MessageResponse>> {
    let email = normalize_email(&payload.email)?;
    let user = repo::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    if user.verified {
        return Err(AppError::bad_request("the account is already verified"));
    }

    let token = generate_token();
    let expires_at = expires_in(state.config.verification_ttl_minutes);
    repo::set_verification_token(&state.db, user.id, &token, expires_at).await?;

    let url = format!("{}/verify/{}", state.config.frontend_url, token);
    state
        .mailer
        .send(templates::verification_resend(&user.email, &user.name, &url))
        .await?;

    info!(user_id = %user.id, "verification email resent");
    Ok(Json(MessageResponse {
        msg: "verification email resent",
    }))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<EmailRequest>,
) -> AppResult<Json<MessageResponse>> {
    let email = normalize_email(&payload.email)?;
    let user = repo::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| AppError::not_found("no account exists with that email"))?;

    let token = generate_token();
    let ttl = state.config.reset_ttl_minutes;
    repo::set_reset_token(&state.db, user.id, &token, expires_in(ttl)).await?;

    let url = format!("{}/reset-password/{}", state.config.frontend_url, token);
    state
        .mailer
        .send(templates::password_reset(&user.email, &user.name, &url, ttl))
        .await?;

    info!(user_id = %user.id, "password reset requested");
    Ok(Json(MessageResponse {
        msg: "we have sent an email with the instructions",
    }))
}

#[instrument(skip(state, token, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    PathParam(token): PathParam<String>,
    JsonBody(payload): JsonBody<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    validate_password(&payload.password)?;
    // Hashing is expensive; dead tokens are refused before it.
    if !repo::reset_token_is_live(&state.db, &token).await? {
        return Err(AppError::bad_request("invalid or expired token"));
    }
    let hash = hash_password(payload.password).await?;

    let user_id = repo::reset_password_by_token(&state.db, &token, &hash)
        .await?
        .ok_or_else(|| AppError::bad_request("invalid or expired token"))?;

    info!(user_id = %user_id, "password reset");
    Ok(Json(MessageResponse {
        msg: "password updated successfully",
    }))
}

/// Heartbeat: the session layer already stamped activity and renewed the cookie.
pub async fn activity() -> Json<ActivityResponse> {
    Json(ActivityResponse { ok: true })
}
