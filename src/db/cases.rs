use chrono::{DateTime, Utc};
use rand::Rng;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Case, CaseKind, Location, TimelineEntry};

/// Unambiguous alphabet for human-readable case ids (no 0/O, 1/I/L).
const ID_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const ID_SUFFIX_LEN: usize = 6;
const ID_ATTEMPTS: usize = 5;

fn generate_case_id(prefix: &str) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{prefix}-{suffix}")
}

pub async fn create(
    pool: &PgPool,
    kind: CaseKind,
    user_id: Uuid,
    category: &str,
    title: &str,
    description: &str,
    images: &[String],
    location: Location,
    preferred_visit_at: Option<DateTime<Utc>>,
) -> Result<Case, sqlx::Error> {
    let query = format!(
        "INSERT INTO {} (case_id, user_id, category, title, description, images,
         lat, lng, preferred_visit_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
        kind.table()
    );

    for attempt in 1..=ID_ATTEMPTS {
        let case_id = generate_case_id(kind.id_prefix());
        let result = sqlx::query_as::<_, Case>(&query)
            .bind(&case_id)
            .bind(user_id)
            .bind(category)
            .bind(title)
            .bind(description)
            .bind(images)
            .bind(location.lat)
            .bind(location.lng)
            .bind(preferred_visit_at)
            .fetch_one(pool)
            .await;

        match result {
            // Collision on the random suffix: retry with a fresh id
            Err(sqlx::Error::Database(ref db_err))
                if db_err.is_unique_violation() && attempt < ID_ATTEMPTS =>
            {
                continue;
            }
            other => return other,
        }
    }

    unreachable!("case id retry loop always returns on the last attempt")
}

pub async fn list_all(pool: &PgPool, kind: CaseKind) -> Result<Vec<Case>, sqlx::Error> {
    sqlx::query_as::<_, Case>(&format!(
        "SELECT * FROM {} ORDER BY created_at DESC",
        kind.table()
    ))
    .fetch_all(pool)
    .await
}

pub async fn list_for_user(
    pool: &PgPool,
    kind: CaseKind,
    user_id: Uuid,
) -> Result<Vec<Case>, sqlx::Error> {
    sqlx::query_as::<_, Case>(&format!(
        "SELECT * FROM {} WHERE user_id = $1 ORDER BY created_at DESC",
        kind.table()
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn find_by_id(
    pool: &PgPool,
    kind: CaseKind,
    id: Uuid,
) -> Result<Option<Case>, sqlx::Error> {
    sqlx::query_as::<_, Case>(&format!("SELECT * FROM {} WHERE id = $1", kind.table()))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Append-only: a single-statement JSONB array concatenation, so concurrent
/// appends are serialized by the store and never dropped.
pub async fn append_timeline_entry(
    pool: &PgPool,
    kind: CaseKind,
    id: Uuid,
    entry: &TimelineEntry,
) -> Result<Option<Case>, sqlx::Error> {
    sqlx::query_as::<_, Case>(&format!(
        "UPDATE {} SET timeline = timeline || jsonb_build_array($2::jsonb),
         updated_at = now()
         WHERE id = $1 RETURNING *",
        kind.table()
    ))
    .bind(id)
    .bind(Json(entry))
    .fetch_optional(pool)
    .await
}

/// Add `user_id` to the seen-set of the timeline entry at `index`.
/// The containment guard makes re-acknowledging a no-op (0 rows affected).
pub async fn mark_seen(
    pool: &PgPool,
    kind: CaseKind,
    id: Uuid,
    index: i32,
    user_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(&format!(
        "UPDATE {} SET timeline = jsonb_set(
             timeline,
             ARRAY[$2::text, 'seen_by'],
             timeline->$2->'seen_by' || to_jsonb($3::text)
         ), updated_at = now()
         WHERE id = $1
           AND timeline->$2 IS NOT NULL
           AND NOT timeline->$2->'seen_by' @> to_jsonb($3::text)",
        kind.table()
    ))
    .bind(id)
    .bind(index)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Partial update: absent fields are left unchanged.
pub async fn update_status_visit(
    pool: &PgPool,
    kind: CaseKind,
    id: Uuid,
    status: Option<&str>,
    assigned_visit_at: Option<DateTime<Utc>>,
) -> Result<Option<Case>, sqlx::Error> {
    sqlx::query_as::<_, Case>(&format!(
        "UPDATE {} SET status = COALESCE($2, status),
         assigned_visit_at = COALESCE($3, assigned_visit_at),
         updated_at = now()
         WHERE id = $1 RETURNING *",
        kind.table()
    ))
    .bind(id)
    .bind(status)
    .bind(assigned_visit_at)
    .fetch_optional(pool)
    .await
}

pub async fn count_for_user(
    pool: &PgPool,
    kind: CaseKind,
    user_id: Uuid,
) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(*) FROM {} WHERE user_id = $1",
        kind.table()
    ))
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}
