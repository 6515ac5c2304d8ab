use axum::extract::State;
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::auth::jwt::{encode_token, Claims};
use crate::auth::password;
use crate::db;
use crate::error::AppError;
use crate::middleware::audit;
use crate::models::{Location, Outlet, User};
use crate::state::SharedState;

/// The login entry point is polymorphic: the payload shape selects the
/// credential variant. Admins authenticate against the configured allow-list,
/// users against their stored password hash.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum LoginRequest {
    Admin { username: String, password: String },
    User { email: String, password: String },
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub company_name: String,
    pub phone: String,
    pub email: String,
    pub password: String,
    pub address: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub address: Option<String>,
    pub location: Option<Location>,
    pub outlets: Option<Vec<Outlet>>,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: AuthUserInfo,
}

#[derive(Serialize)]
pub struct AuthUserInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub company_name: String,
}

impl From<&User> for AuthUserInfo {
    fn from(user: &User) -> Self {
        AuthUserInfo {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            company_name: user.company_name.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn issue_token(user: &User, secret: &str) -> Result<AuthResponse, AppError> {
    let claims = Claims::new(user.id, user.role.clone());
    let token = encode_token(&claims, secret).map_err(AppError::Internal)?;
    Ok(AuthResponse {
        token,
        user: AuthUserInfo::from(user),
    })
}

fn generate_reset_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    match req {
        LoginRequest::Admin { username, password } => {
            if state.login_limiter.check(&username).is_err() {
                return Err(AppError::RateLimited(
                    "Too many login attempts. Please try again later.".to_string(),
                ));
            }

            if !state.config.check_admin_credentials(&username, &password) {
                state.login_limiter.record_failure(&username);
                return Err(AppError::Unauthorized(
                    "Invalid admin credentials".to_string(),
                ));
            }

            // First login for this allow-list entry materializes the account;
            // the upsert makes concurrent first logins converge on one row.
            let email = format!("admin-{username}@system.local");
            let admin = match db::users::find_by_email(&state.pool, &email).await? {
                Some(user) => user,
                None => {
                    let pw_hash = password::hash(&password).map_err(AppError::Internal)?;
                    db::users::ensure_admin(
                        &state.pool,
                        &format!("Admin {username}"),
                        &format!("admin-{username}"),
                        &email,
                        &pw_hash,
                    )
                    .await?
                }
            };

            audit::log_event(
                &state.pool,
                Some(admin.id),
                "admin.login",
                "user",
                Some(admin.id),
                None,
            )
            .await;

            Ok(Json(issue_token(&admin, &state.config.jwt_secret)?))
        }
        LoginRequest::User { email, password } => {
            if email.is_empty() || password.is_empty() {
                return Err(AppError::BadRequest(
                    "Email & password required".to_string(),
                ));
            }

            let email = email.trim().to_lowercase();

            if state.login_limiter.check(&email).is_err() {
                return Err(AppError::RateLimited(
                    "Too many login attempts. Please try again later.".to_string(),
                ));
            }

            let user = db::users::find_by_email(&state.pool, &email)
                .await?
                .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

            let valid =
                password::verify(&password, &user.password_hash).map_err(AppError::Internal)?;

            if !valid {
                state.login_limiter.record_failure(&email);
                return Err(AppError::Unauthorized("Invalid credentials".to_string()));
            }

            audit::log_event(
                &state.pool,
                Some(user.id),
                "user.login",
                "user",
                Some(user.id),
                None,
            )
            .await;

            Ok(Json(issue_token(&user, &state.config.jwt_secret)?))
        }
    }
}

pub async fn register(
    State(state): State<SharedState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if req.name.is_empty()
        || req.company_name.is_empty()
        || req.phone.is_empty()
        || req.email.is_empty()
        || req.password.is_empty()
        || req.address.is_empty()
    {
        return Err(AppError::BadRequest(
            "Please provide all required fields".to_string(),
        ));
    }

    if req.password.len() < 8 {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let email = req.email.trim().to_lowercase();
    let phone = req.phone.trim().to_string();

    if db::users::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(AppError::Conflict(
            "User already exists with this email".to_string(),
        ));
    }

    let location = match (req.lat, req.lng) {
        (Some(lat), Some(lng)) => Location { lat, lng },
        _ => Location { lat: 0.0, lng: 0.0 },
    };

    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;

    // The unique constraints back the pre-check under concurrent registration.
    let user = db::users::create(
        &state.pool,
        &req.name,
        &req.company_name,
        &phone,
        &email,
        &pw_hash,
        &req.address,
        location,
    )
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            if db_err.constraint() == Some("users_phone_key") {
                AppError::Conflict("User already exists with this phone number".to_string())
            } else {
                AppError::Conflict("User already exists with this email".to_string())
            }
        }
        _ => AppError::Database(e),
    })?;

    audit::log_event(
        &state.pool,
        Some(user.id),
        "user.registered",
        "user",
        Some(user.id),
        None,
    )
    .await;

    Ok(Json(issue_token(&user, &state.config.jwt_secret)?))
}

pub async fn me(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<User>, AppError> {
    let user = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}

pub async fn update_profile(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<User>, AppError> {
    let user = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let name = req.name.as_deref().filter(|s| !s.is_empty()).unwrap_or(&user.name);
    let company_name = req
        .company_name
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(&user.company_name);
    let address = req
        .address
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(&user.address);

    let phone = match req.phone.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(phone) if phone != user.phone => {
            if db::users::phone_taken_by_other(&state.pool, phone, user.id).await? {
                return Err(AppError::Conflict("Phone number already in use".to_string()));
            }
            phone
        }
        Some(phone) => phone,
        None => user.phone.as_str(),
    };

    let location = req.location.unwrap_or(user.location);
    let outlets = req.outlets.as_deref().unwrap_or(&user.outlets.0);

    // Email is immutable after registration.
    let updated = db::users::update_profile(
        &state.pool,
        user.id,
        name,
        phone,
        company_name,
        address,
        location,
        outlets,
    )
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("Phone number already in use".to_string())
        }
        _ => AppError::Database(e),
    })?;

    Ok(Json(updated))
}

pub async fn forgot_password(
    State(state): State<SharedState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    // Always return 200 to not reveal whether the email exists.
    let response = Json(MessageResponse {
        message: "If that email is registered, a reset link has been sent.".to_string(),
    });

    let pool = state.pool.clone();
    let mailer = state.mailer.clone();
    let base_url = state.config.base_url.clone();
    let email = req.email.trim().to_lowercase();

    tokio::spawn(async move {
        if let Ok(Some(user)) = db::users::find_by_email(&pool, &email).await {
            let token = generate_reset_token();
            let token_hash = hash_token(&token);

            if db::users::set_reset_token(&pool, user.id, &token_hash, Utc::now() + Duration::hours(1))
                .await
                .is_ok()
            {
                if let Some(mailer) = mailer {
                    let reset_url = format!("{base_url}/auth/reset-password?token={token}");
                    if let Err(e) = mailer.send_password_reset(&user.email, &reset_url).await {
                        tracing::error!("Failed to send password reset email: {e}");
                    }
                } else {
                    tracing::warn!("SMTP not configured. Password reset token: {token}");
                }
            }
        }
    });

    Ok(response)
}

pub async fn reset_password(
    State(state): State<SharedState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    if req.password.len() < 8 {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let token_hash = hash_token(&req.token);

    let user = db::users::find_by_valid_reset_token(&state.pool, &token_hash)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid or expired reset token".to_string()))?;

    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;
    db::users::update_password(&state.pool, user.id, &pw_hash).await?;

    audit::log_event(
        &state.pool,
        Some(user.id),
        "user.password_reset",
        "user",
        Some(user.id),
        None,
    )
    .await;

    Ok(Json(MessageResponse {
        message: "Password reset successfully".to_string(),
    }))
}
