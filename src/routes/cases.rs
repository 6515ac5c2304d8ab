use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::email;
use crate::error::AppError;
use crate::middleware::audit;
use crate::models::{Case, CaseKind, CaseStatus, CaseWithOwner, TimelineEntry, User, UserSummary};
use crate::state::SharedState;

pub const MAX_IMAGES: usize = 5;

#[derive(Deserialize)]
pub struct CreateCaseRequest {
    pub category: String,
    pub title: String,
    pub description: String,
    /// Reference URLs produced by the external object storage, at most 5.
    #[serde(default)]
    pub images: Vec<String>,
    pub preferred_visit_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct UpdateCaseRequest {
    pub status: Option<CaseStatus>,
    pub assigned_visit_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct AddCommentRequest {
    pub note: String,
}

/// Human-readable summary of an admin status/visit update. `None` means
/// nothing actually changed and no notification is warranted.
#[derive(Debug, PartialEq)]
pub struct UpdateSummary {
    pub message: String,
    pub closing: bool,
}

pub fn compose_update_summary(
    kind: CaseKind,
    old_status: &str,
    new_status: &str,
    old_visit: Option<DateTime<Utc>>,
    new_visit: Option<DateTime<Utc>>,
) -> Option<UpdateSummary> {
    let mut message = String::new();

    if new_visit.is_some() && new_visit != old_visit {
        message.push_str(&format!(
            "A visit has been scheduled for your {}.\n\n",
            kind.label()
        ));
    }

    let closing =
        new_status != old_status && new_status == kind.closing_status().as_str();

    if new_status != old_status {
        if closing {
            message.push_str(&format!(
                "Your {} has been closed as the service is completed.\n\n",
                kind.label()
            ));
            message.push_str(&format!(
                "Thank you for using our service. If you have any further issues, please create a new {}.\n\n",
                kind.label()
            ));
        } else {
            message.push_str(&format!(
                "Your {} status has been updated to: {}.\n\n",
                kind.label(),
                new_status
            ));
        }
    }

    if message.is_empty() {
        return None;
    }

    if !closing {
        message.push_str("Please check your dashboard for more details.");
    }

    Some(UpdateSummary { message, closing })
}

// ── Shared handler bodies ───────────────────────────────────────

async fn create_case(
    kind: CaseKind,
    auth: AuthUser,
    state: SharedState,
    req: CreateCaseRequest,
) -> Result<Json<CaseWithOwner>, AppError> {
    if req.category.is_empty() || req.title.is_empty() || req.description.is_empty() {
        return Err(AppError::BadRequest(
            "Please provide category, title and description".to_string(),
        ));
    }

    if req.images.len() > MAX_IMAGES {
        return Err(AppError::BadRequest(format!(
            "At most {MAX_IMAGES} images are allowed"
        )));
    }

    let owner = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    // The location snapshot comes from the saved profile; (0,0) counts as
    // never set, even though it is a legitimate coordinate.
    if owner.location.is_unset() {
        return Err(AppError::BadRequest(
            "User location is not set. Please update your profile.".to_string(),
        ));
    }

    let case = db::cases::create(
        &state.pool,
        kind,
        owner.id,
        &req.category,
        &req.title,
        &req.description,
        &req.images,
        owner.location,
        req.preferred_visit_at,
    )
    .await?;

    audit::log_event(
        &state.pool,
        Some(owner.id),
        &format!("{}.created", kind.key()),
        kind.key(),
        Some(case.id),
        None,
    )
    .await;

    notify_case_created(&state, kind, &case, &owner);

    Ok(Json(CaseWithOwner {
        owner: Some(UserSummary::from(&owner)),
        case,
    }))
}

async fn list_cases(
    kind: CaseKind,
    auth: AuthUser,
    state: SharedState,
) -> Result<Json<Vec<CaseWithOwner>>, AppError> {
    let cases = if auth.is_admin() {
        db::cases::list_all(&state.pool, kind).await?
    } else {
        db::cases::list_for_user(&state.pool, kind, auth.user_id).await?
    };

    let joined = join_owners(&state.pool, cases).await?;
    Ok(Json(joined))
}

async fn get_case(
    kind: CaseKind,
    auth: AuthUser,
    state: SharedState,
    id: Uuid,
) -> Result<Json<CaseWithOwner>, AppError> {
    let case = find_case(&state.pool, kind, id).await?;
    require_owner_or_admin(&auth, &case)?;

    let owner = db::users::find_by_id(&state.pool, case.user_id).await?;
    Ok(Json(CaseWithOwner {
        owner: owner.as_ref().map(UserSummary::from),
        case,
    }))
}

async fn update_case(
    kind: CaseKind,
    auth: AuthUser,
    state: SharedState,
    id: Uuid,
    req: UpdateCaseRequest,
) -> Result<Json<CaseWithOwner>, AppError> {
    auth.require_admin()?;

    let before = find_case(&state.pool, kind, id).await?;
    let old_status = before.status.clone();
    let old_visit = before.assigned_visit_at;

    let case = db::cases::update_status_visit(
        &state.pool,
        kind,
        id,
        req.status.map(CaseStatus::as_str),
        req.assigned_visit_at,
    )
    .await?
    .ok_or_else(|| AppError::NotFound(format!("{} not found", kind.title_label())))?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        &format!("{}.updated", kind.key()),
        kind.key(),
        Some(case.id),
        Some(serde_json::json!({
            "status": case.status,
            "assigned_visit_at": case.assigned_visit_at,
        })),
    )
    .await;

    let owner = db::users::find_by_id(&state.pool, case.user_id).await?;

    if let Some(summary) = compose_update_summary(
        kind,
        &old_status,
        &case.status,
        old_visit,
        case.assigned_visit_at,
    ) {
        if let Some(ref owner) = owner {
            notify_case_update(&state, kind, &case, owner, &summary.message, summary.closing);
        }
    }

    Ok(Json(CaseWithOwner {
        owner: owner.as_ref().map(UserSummary::from),
        case,
    }))
}

async fn add_comment(
    kind: CaseKind,
    auth: AuthUser,
    state: SharedState,
    id: Uuid,
    req: AddCommentRequest,
) -> Result<Json<CaseWithOwner>, AppError> {
    if req.note.is_empty() {
        return Err(AppError::BadRequest("Please provide a note".to_string()));
    }

    let case = find_case(&state.pool, kind, id).await?;
    require_owner_or_admin(&auth, &case)?;

    let commenter = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    let entry = TimelineEntry {
        note: req.note.clone(),
        added_by: commenter.name.clone(),
        seen_by: Vec::new(),
        added_at: Utc::now(),
    };

    let case = db::cases::append_timeline_entry(&state.pool, kind, id, &entry)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} not found", kind.title_label())))?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        &format!("{}.commented", kind.key()),
        kind.key(),
        Some(case.id),
        None,
    )
    .await;

    let owner = db::users::find_by_id(&state.pool, case.user_id).await?;

    if commenter.is_admin() {
        if let Some(ref owner) = owner {
            notify_case_update(&state, kind, &case, owner, &req.note, false);
        }
    }

    Ok(Json(CaseWithOwner {
        owner: owner.as_ref().map(UserSummary::from),
        case,
    }))
}

async fn mark_seen(
    kind: CaseKind,
    auth: AuthUser,
    state: SharedState,
    id: Uuid,
    index: usize,
) -> Result<Json<CaseWithOwner>, AppError> {
    let case = find_case(&state.pool, kind, id).await?;

    // Only the owner acknowledges entries; admins are excluded too.
    if case.user_id != auth.user_id {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }

    if index >= case.timeline.0.len() {
        return Err(AppError::NotFound("Timeline item not found".to_string()));
    }

    // 0 rows affected means the entry was already acknowledged; that is fine.
    db::cases::mark_seen(&state.pool, kind, id, index as i32, auth.user_id).await?;

    let case = find_case(&state.pool, kind, id).await?;
    let owner = db::users::find_by_id(&state.pool, case.user_id).await?;
    Ok(Json(CaseWithOwner {
        owner: owner.as_ref().map(UserSummary::from),
        case,
    }))
}

// ── Helpers ─────────────────────────────────────────────────────

async fn find_case(pool: &PgPool, kind: CaseKind, id: Uuid) -> Result<Case, AppError> {
    db::cases::find_by_id(pool, kind, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} not found", kind.title_label())))
}

fn require_owner_or_admin(auth: &AuthUser, case: &Case) -> Result<(), AppError> {
    if auth.is_admin() || case.user_id == auth.user_id {
        Ok(())
    } else {
        Err(AppError::Forbidden("Access denied".to_string()))
    }
}

async fn join_owners(pool: &PgPool, cases: Vec<Case>) -> Result<Vec<CaseWithOwner>, AppError> {
    let mut ids: Vec<Uuid> = cases.iter().map(|c| c.user_id).collect();
    ids.sort_unstable();
    ids.dedup();

    let owners = db::users::find_by_ids(pool, &ids).await?;
    let by_id: HashMap<Uuid, UserSummary> = owners
        .iter()
        .map(|u| (u.id, UserSummary::from(u)))
        .collect();

    Ok(cases
        .into_iter()
        .map(|case| CaseWithOwner {
            owner: by_id.get(&case.user_id).cloned(),
            case,
        })
        .collect())
}

fn notify_case_created(state: &SharedState, kind: CaseKind, case: &Case, owner: &User) {
    let Some(mailer) = state.mailer.clone() else {
        tracing::warn!("SMTP not configured; skipping {} notifications", kind.label());
        return;
    };

    match state.config.admin_email.clone() {
        Some(admin_email) => {
            let mailer = mailer.clone();
            let case = case.clone();
            let owner = owner.clone();
            email::spawn_delivery("new case alert", async move {
                mailer
                    .send_new_case_alert(&admin_email, kind, &case, &owner)
                    .await
            });
        }
        None => {
            tracing::warn!("ADMIN_EMAIL not configured; skipping new {} alert", kind.label());
        }
    }

    let case = case.clone();
    let owner = owner.clone();
    email::spawn_delivery("confirmation", async move {
        mailer.send_case_confirmation(kind, &case, &owner).await
    });
}

fn notify_case_update(
    state: &SharedState,
    kind: CaseKind,
    case: &Case,
    owner: &User,
    note: &str,
    closing: bool,
) {
    let Some(mailer) = state.mailer.clone() else {
        tracing::warn!("SMTP not configured; skipping {} update notification", kind.label());
        return;
    };

    let case = case.clone();
    let owner = owner.clone();
    let note = note.to_string();
    email::spawn_delivery("case update", async move {
        mailer
            .send_case_update(kind, &case, &owner, &note, closing)
            .await
    });
}

// ── Ticket handlers ─────────────────────────────────────────────

pub async fn create_ticket(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<CreateCaseRequest>,
) -> Result<Json<CaseWithOwner>, AppError> {
    create_case(CaseKind::Ticket, auth, state, req).await
}

pub async fn list_tickets(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<CaseWithOwner>>, AppError> {
    list_cases(CaseKind::Ticket, auth, state).await
}

pub async fn get_ticket(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CaseWithOwner>, AppError> {
    get_case(CaseKind::Ticket, auth, state, id).await
}

pub async fn update_ticket(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCaseRequest>,
) -> Result<Json<CaseWithOwner>, AppError> {
    update_case(CaseKind::Ticket, auth, state, id, req).await
}

pub async fn comment_ticket(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddCommentRequest>,
) -> Result<Json<CaseWithOwner>, AppError> {
    add_comment(CaseKind::Ticket, auth, state, id, req).await
}

pub async fn mark_ticket_seen(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<CaseWithOwner>, AppError> {
    mark_seen(CaseKind::Ticket, auth, state, id, index).await
}

// ── Service request handlers ────────────────────────────────────

pub async fn create_service_request(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<CreateCaseRequest>,
) -> Result<Json<CaseWithOwner>, AppError> {
    create_case(CaseKind::ServiceRequest, auth, state, req).await
}

pub async fn list_service_requests(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<CaseWithOwner>>, AppError> {
    list_cases(CaseKind::ServiceRequest, auth, state).await
}

pub async fn get_service_request(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CaseWithOwner>, AppError> {
    get_case(CaseKind::ServiceRequest, auth, state, id).await
}

pub async fn update_service_request(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCaseRequest>,
) -> Result<Json<CaseWithOwner>, AppError> {
    update_case(CaseKind::ServiceRequest, auth, state, id, req).await
}

pub async fn comment_service_request(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddCommentRequest>,
) -> Result<Json<CaseWithOwner>, AppError> {
    add_comment(CaseKind::ServiceRequest, auth, state, id, req).await
}

pub async fn mark_service_request_seen(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<CaseWithOwner>, AppError> {
    mark_seen(CaseKind::ServiceRequest, auth, state, id, index).await
}
