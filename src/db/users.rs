use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Location, Outlet, User};

pub async fn create(
    pool: &PgPool,
    name: &str,
    company_name: &str,
    phone: &str,
    email: &str,
    password_hash: &str,
    address: &str,
    location: Location,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (name, company_name, phone, email, password_hash, address, lat, lng)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
    )
    .bind(name)
    .bind(company_name)
    .bind(phone)
    .bind(email)
    .bind(password_hash)
    .bind(address)
    .bind(location.lat)
    .bind(location.lng)
    .fetch_one(pool)
    .await
}

/// Idempotent "ensure admin account" keyed by the unique synthetic email.
/// Concurrent first logins for the same admin username both land on the same
/// row; the no-op DO UPDATE makes the insert return the existing row.
pub async fn ensure_admin(
    pool: &PgPool,
    name: &str,
    phone: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (name, company_name, phone, email, password_hash, address, lat, lng, role)
         VALUES ($1, 'System Admin', $2, $3, $4, 'System', 0, 0, 'admin')
         ON CONFLICT (email) DO UPDATE SET updated_at = now()
         RETURNING *",
    )
    .bind(name)
    .bind(phone)
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
}

pub async fn list_all(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

pub async fn phone_taken_by_other(
    pool: &PgPool,
    phone: &str,
    user_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM users WHERE phone = $1 AND id <> $2")
            .bind(phone)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}

pub async fn update_profile(
    pool: &PgPool,
    id: Uuid,
    name: &str,
    phone: &str,
    company_name: &str,
    address: &str,
    location: Location,
    outlets: &[Outlet],
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET name = $2, phone = $3, company_name = $4, address = $5,
         lat = $6, lng = $7, outlets = $8, updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(name)
    .bind(phone)
    .bind(company_name)
    .bind(address)
    .bind(location.lat)
    .bind(location.lng)
    .bind(Json(outlets))
    .fetch_one(pool)
    .await
}

pub async fn update_password(
    pool: &PgPool,
    id: Uuid,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET password_hash = $2, reset_token_hash = NULL,
         reset_token_expires_at = NULL, updated_at = now() WHERE id = $1",
    )
    .bind(id)
    .bind(password_hash)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_reset_token(
    pool: &PgPool,
    id: Uuid,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET reset_token_hash = $2, reset_token_expires_at = $3,
         updated_at = now() WHERE id = $1",
    )
    .bind(id)
    .bind(token_hash)
    .bind(expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_by_valid_reset_token(
    pool: &PgPool,
    token_hash: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE reset_token_hash = $1 AND reset_token_expires_at > now()",
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await
}

/// Deleting a user cascades to their tickets and service requests via the
/// foreign keys, so the cleanup commits atomically with the delete.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
