use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::middleware::audit;
use crate::models::{AuditEvent, CaseKind, User};
use crate::state::SharedState;

#[derive(Serialize)]
pub struct UserWithCaseCounts {
    #[serde(flatten)]
    pub user: User,
    pub ticket_count: i64,
    pub service_request_count: i64,
}

async fn with_case_counts(
    state: &SharedState,
    user: User,
) -> Result<UserWithCaseCounts, AppError> {
    let ticket_count =
        db::cases::count_for_user(&state.pool, CaseKind::Ticket, user.id).await?;
    let service_request_count =
        db::cases::count_for_user(&state.pool, CaseKind::ServiceRequest, user.id).await?;
    Ok(UserWithCaseCounts {
        user,
        ticket_count,
        service_request_count,
    })
}

pub async fn list_users(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<UserWithCaseCounts>>, AppError> {
    auth.require_admin()?;

    let users = db::users::list_all(&state.pool).await?;
    let mut out = Vec::with_capacity(users.len());
    for user in users {
        out.push(with_case_counts(&state, user).await?);
    }
    Ok(Json(out))
}

pub async fn get_user(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserWithCaseCounts>, AppError> {
    auth.require_admin()?;

    let user = db::users::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(with_case_counts(&state, user).await?))
}

pub async fn delete_user(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    let user = db::users::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if user.is_admin() {
        return Err(AppError::Forbidden("Cannot delete admin users".to_string()));
    }

    // Tickets and service requests go with the user via the FK cascade.
    db::users::delete(&state.pool, user.id).await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "user.deleted",
        "user",
        Some(user.id),
        None,
    )
    .await;

    Ok(Json(serde_json::json!({ "message": "User deleted successfully" })))
}

#[derive(Deserialize)]
pub struct AuditListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_audit_events(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<AuditListParams>,
) -> Result<Json<Vec<AuditEvent>>, AppError> {
    auth.require_admin()?;

    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    let offset = params.offset.unwrap_or(0).max(0);

    let events = db::audit::list(&state.pool, limit, offset).await?;
    Ok(Json(events))
}
