use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        AdminUpdateRequest, MeResponse, MessageResponse, ProfileUpdateRequest, RegisterRequest,
        UserEnvelope,
    },
    repo,
    repo_types::{ManagedUser, NewUser, PublicUser, UserRole, UserSummary},
};
use crate::{
    auth::{
        extractors::CurrentUser,
        password::hash_password,
        services::{expires_in, generate_token},
    },
    error::{is_foreign_key_violation, is_unique_violation, AppError, AppResult},
    extract::{JsonBody, PathParam},
    mail::templates,
    state::AppState,
};

/// Routes for any authenticated user.
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(me).put(edit_profile))
        .route("/me/role", get(me_role))
        .route("/profile", get(show_profile))
}

/// Routes that additionally sit behind `require_admin`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(register))
        .route(
            "/:id",
            get(show_user).put(edit_user).delete(delete_user),
        )
}

#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn register(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserEnvelope<PublicUser>>)> {
    let input = payload.validate()?;

    if repo::find_by_email(&state.db, &input.email).await?.is_some() {
        warn!(email = %input.email, "email already registered");
        return Err(AppError::bad_request("the user is already registered"));
    }

    let password_hash = hash_password(input.password).await?;
    let token = generate_token();
    let ttl = state.config.verification_ttl_minutes;

    let user = repo::create(
        &state.db,
        NewUser {
            name: &input.name,
            email: &input.email,
            password_hash: &password_hash,
            role_id: input.role_id.unwrap_or(state.config.default_role_id),
            verification_token: &token,
            verification_expires_at: expires_in(ttl),
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::bad_request("the user is already registered")
        } else if is_foreign_key_violation(&e) {
            AppError::bad_request("unknown role")
        } else {
            AppError::from(e)
        }
    })?;

    let url = format!("{}/verify/{}", state.config.frontend_url, token);
    let msg = match state
        .mailer
        .send(templates::verification(&user.email, &user.name, &url, ttl))
        .await
    {
        Ok(()) => "user registered, check the email inbox to verify the account",
        Err(e) => {
            error!(error = %e, user_id = %user.id, "verification email failed");
            "user registered, but the verification email could not be sent"
        }
    };

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(UserEnvelope { msg, user })))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn me(CurrentUser(user): CurrentUser) -> Json<MeResponse> {
    Json(MeResponse {
        msg: "user authenticated successfully",
        user,
    })
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn me_role(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<UserRole>> {
    let role = repo::find_role(&state.db, user.id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;
    Ok(Json(role))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserSummary>>> {
    Ok(Json(repo::list(&state.db).await?))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<UserSummary>> {
    let summary = repo::find_summary(&state.db, user.id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;
    Ok(Json(summary))
}

#[instrument(skip(state))]
pub async fn show_user(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
) -> AppResult<Json<UserSummary>> {
    let summary = repo::find_summary(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;
    Ok(Json(summary))
}

#[instrument(skip(state, payload))]
pub async fn edit_user(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<AdminUpdateRequest>,
) -> AppResult<Json<UserEnvelope<ManagedUser>>> {
    let changes = payload.into_changes()?;

    let user = repo::update_managed(&state.db, id, changes)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::bad_request("unknown role")
            } else {
                AppError::from(e)
            }
        })?
        .ok_or_else(|| AppError::not_found("the user does not exist"))?;

    info!(user_id = %user.id, role_id = user.role_id, status = %user.status, "user updated by admin");
    Ok(Json(UserEnvelope {
        msg: "user updated successfully",
        user,
    }))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn edit_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(payload): JsonBody<ProfileUpdateRequest>,
) -> AppResult<Json<UserEnvelope<PublicUser>>> {
    let changes = payload.into_changes()?;

    let updated = repo::update_profile(&state.db, user.id, changes)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::bad_request("that email is already in use")
            } else {
                AppError::from(e)
            }
        })?
        .ok_or_else(|| AppError::not_found("the user does not exist"))?;

    info!(user_id = %updated.id, "profile updated");
    Ok(Json(UserEnvelope {
        msg: "profile updated successfully",
        user: updated,
    }))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    if !repo::delete(&state.db, id).await? {
        return Err(AppError::not_found("the user does not exist"));
    }
    info!(user_id = %id, "user deleted");
    Ok(Json(MessageResponse {
        msg: "user deleted successfully",
    }))
}
