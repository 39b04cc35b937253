use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{
    AdminChanges, LoginUser, ManagedUser, NewUser, ProfileChanges, PublicUser, SessionUser,
    UserRecord, UserRole, UserSummary,
};

pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<UserRecord>> {
    sqlx::query_as::<_, UserRecord>(
        r#"
        SELECT id, name, email, verified
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(db)
    .await
}

pub async fn find_for_login(db: &PgPool, email: &str) -> sqlx::Result<Option<LoginUser>> {
    sqlx::query_as::<_, LoginUser>(
        r#"
        SELECT u.id, u.name, u.email, u.password_hash, u.verified,
               r.id AS role_id, r.name AS role_name
        FROM users u
        INNER JOIN roles r ON r.id = u.role_id
        WHERE u.email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(db)
    .await
}

pub async fn find_session_user(db: &PgPool, id: Uuid) -> sqlx::Result<Option<SessionUser>> {
    sqlx::query_as::<_, SessionUser>(
        r#"
        SELECT u.id, u.name, u.email, u.role_id, r.name AS role_name, u.last_activity
        FROM users u
        INNER JOIN roles r ON r.id = u.role_id
        WHERE u.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn find_role(db: &PgPool, id: Uuid) -> sqlx::Result<Option<UserRole>> {
    sqlx::query_as::<_, UserRole>(
        r#"
        SELECT u.name, u.email, r.id AS role_id, r.name AS role_name
        FROM users u
        INNER JOIN roles r ON r.id = u.role_id
        WHERE u.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn create(db: &PgPool, new: NewUser<'_>) -> sqlx::Result<PublicUser> {
    sqlx::query_as::<_, PublicUser>(
        r#"
        INSERT INTO users (name, email, password_hash, role_id, verified,
                           verification_token, verification_token_expires_at)
        VALUES ($1, $2, $3, $4, FALSE, $5, $6)
        RETURNING id, name, email, role_id
        "#,
    )
    .bind(new.name)
    .bind(new.email)
    .bind(new.password_hash)
    .bind(new.role_id)
    .bind(new.verification_token)
    .bind(new.verification_expires_at)
    .fetch_one(db)
    .await
}

/// Consumes an unexpired verification token. Returns the verified user's id.
pub async fn verify_by_token(db: &PgPool, token: &str) -> sqlx::Result<Option<Uuid>> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        UPDATE users
        SET verified = TRUE,
            verification_token = NULL,
            verification_token_expires_at = NULL
        WHERE verification_token = $1
          AND verification_token_expires_at > NOW()
        RETURNING id
        "#,
    )
    .bind(token)
    .fetch_optional(db)
    .await
}

pub async fn set_verification_token(
    db: &PgPool,
    id: Uuid,
    token: &str,
    expires_at: OffsetDateTime,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET verification_token = $1, verification_token_expires_at = $2
        WHERE id = $3
        "#,
    )
    .bind(token)
    .bind(expires_at)
    .bind(id)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn set_reset_token(
    db: &PgPool,
    id: Uuid,
    token: &str,
    expires_at: OffsetDateTime,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET reset_token = $1, reset_token_expires_at = $2
        WHERE id = $3
        "#,
    )
    .bind(token)
    .bind(expires_at)
    .bind(id)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn reset_token_is_live(db: &PgPool, token: &str) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM users
            WHERE reset_token = $1
              AND reset_token_expires_at > NOW()
        )
        "#,
    )
    .bind(token)
    .fetch_one(db)
    .await
}

/// Replaces the password hash if the reset token is still valid, clearing it.
pub async fn reset_password_by_token(
    db: &PgPool,
    token: &str,
    password_hash: &str,
) -> sqlx::Result<Option<Uuid>> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        UPDATE users
        SET password_hash = $1, reset_token = NULL, reset_token_expires_at = NULL
        WHERE reset_token = $2
          AND reset_token_expires_at > NOW()
        RETURNING id
        "#,
    )
    .bind(password_hash)
    .bind(token)
    .fetch_optional(db)
    .await
}

pub async fn touch_activity(db: &PgPool, id: Uuid) -> sqlx::Result<()> {
    sqlx::query("UPDATE users SET last_activity = NOW() WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn list(db: &PgPool) -> sqlx::Result<Vec<UserSummary>> {
    sqlx::query_as::<_, UserSummary>(
        r#"
        SELECT u.id, u.name, u.email, u.balance, u.status, r.name AS role
        FROM users u
        INNER JOIN roles r ON r.id = u.role_id
        ORDER BY u.created_at ASC
        "#,
    )
    .fetch_all(db)
    .await
}

pub async fn find_summary(db: &PgPool, id: Uuid) -> sqlx::Result<Option<UserSummary>> {
    sqlx::query_as::<_, UserSummary>(
        r#"
        SELECT u.id, u.name, u.email, u.balance, u.status, r.name AS role
        FROM users u
        INNER JOIN roles r ON r.id = u.role_id
        WHERE u.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Absent fields keep their current value.
pub async fn update_managed(
    db: &PgPool,
    id: Uuid,
    changes: AdminChanges,
) -> sqlx::Result<Option<ManagedUser>> {
    sqlx::query_as::<_, ManagedUser>(
        r#"
        UPDATE users
        SET role_id = COALESCE($1, role_id),
            balance = COALESCE($2, balance),
            status  = COALESCE($3, status)
        WHERE id = $4
        RETURNING id, name, email, role_id, balance, status
        "#,
    )
    .bind(changes.role_id)
    .bind(changes.balance)
    .bind(changes.status)
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn update_profile(
    db: &PgPool,
    id: Uuid,
    changes: ProfileChanges,
) -> sqlx::Result<Option<PublicUser>> {
    sqlx::query_as::<_, PublicUser>(
        r#"
        UPDATE users
        SET name  = COALESCE($1, name),
            email = COALESCE($2, email)
        WHERE id = $3
        RETURNING id, name, email, role_id
        "#,
    )
    .bind(changes.name)
    .bind(changes.email)
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn delete(db: &PgPool, id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}
