//! User registration and role operations.

use salon_core::{Role, UserStatus};
use sqlx::PgPool;

use crate::error::{DatabaseError, Result};
use crate::models::User;
use crate::validation::validate_name;

const COLUMNS: &str = "id, chat_id, name, role, status, created_at, updated_at";

/// Fetch the user for a chat, creating a pending master on first contact.
///
/// An existing row keeps its name, role and status.
pub async fn touch_user(pool: &PgPool, chat_id: i64, display_name: &str) -> Result<User> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (chat_id, name)
        VALUES ($1, $2)
        ON CONFLICT (chat_id) DO UPDATE SET updated_at = now()
        RETURNING {COLUMNS}
        "#
    ))
    .bind(chat_id)
    .bind(display_name.trim())
    .fetch_one(pool)
    .await?;

    Ok(user)
}

/// Insert or update a user's name and role.
///
/// A super-admin is never demoted by this call.
pub async fn upsert_user(pool: &PgPool, chat_id: i64, name: &str, role: Role) -> Result<User> {
    let name = validate_name("name", name)?;
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (chat_id, name, role)
        VALUES ($1, $2, $3)
        ON CONFLICT (chat_id) DO UPDATE SET
            name = EXCLUDED.name,
            role = CASE WHEN users.role = 'super_admin' THEN users.role ELSE EXCLUDED.role END,
            updated_at = now()
        RETURNING {COLUMNS}
        "#
    ))
    .bind(chat_id)
    .bind(&name)
    .bind(role)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

/// Make sure the configured super-admin chat exists as an approved super-admin.
pub async fn ensure_super_admin(pool: &PgPool, chat_id: i64, display_name: &str) -> Result<User> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (chat_id, name, role, status)
        VALUES ($1, $2, 'super_admin', 'approved')
        ON CONFLICT (chat_id) DO UPDATE SET
            role = 'super_admin',
            status = 'approved',
            updated_at = now()
        RETURNING {COLUMNS}
        "#
    ))
    .bind(chat_id)
    .bind(display_name.trim())
    .fetch_one(pool)
    .await?;

    Ok(user)
}

/// Record a registration request: full name and requested role, status back to pending.
pub async fn submit_registration(
    pool: &PgPool,
    user_id: i64,
    name: &str,
    role: Role,
) -> Result<User> {
    let name = validate_name("name", name)?;
    sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users SET
            name = $2,
            role = CASE WHEN role = 'super_admin' THEN role ELSE $3 END,
            status = CASE WHEN role = 'super_admin' THEN status ELSE 'pending' END,
            updated_at = now()
        WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(&name)
    .bind(role)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("User", user_id))
}

/// Approve or reject a user.
pub async fn set_status(pool: &PgPool, user_id: i64, status: UserStatus) -> Result<User> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users SET status = $2, updated_at = now()
        WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(status)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("User", user_id))
}

/// Get a user by ID.
pub async fn get_user(pool: &PgPool, id: i64) -> Result<User> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("User", id))
}

/// Get a user by chat id, if known.
pub async fn find_by_chat_id(pool: &PgPool, chat_id: i64) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE chat_id = $1"))
        .bind(chat_id)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

/// Approved users, optionally restricted to one role, ordered by name.
pub async fn list_approved(pool: &PgPool, role: Option<Role>) -> Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {COLUMNS}
        FROM users
        WHERE status = 'approved' AND ($1::text IS NULL OR role = $1)
        ORDER BY name, id
        "#
    ))
    .bind(role)
    .fetch_all(pool)
    .await?;

    Ok(users)
}

/// Chat ids of all approved salon-admins and super-admins.
pub async fn admin_chat_ids(pool: &PgPool) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT chat_id
        FROM users
        WHERE status = 'approved' AND role IN ('salon_admin', 'super_admin')
        ORDER BY chat_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(ids)
}
