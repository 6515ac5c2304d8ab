pub mod auth;
pub mod cases;
pub mod users;

use axum::routing::{get, post, put};
use axum::Router;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Auth & profile
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/me", get(auth::me))
        .route("/api/v1/auth/profile", put(auth::update_profile))
        .route("/api/v1/auth/forgot-password", post(auth::forgot_password))
        .route("/api/v1/auth/reset-password", post(auth::reset_password))
        // Tickets
        .route(
            "/api/v1/tickets",
            get(cases::list_tickets).post(cases::create_ticket),
        )
        .route(
            "/api/v1/tickets/{id}",
            get(cases::get_ticket).put(cases::update_ticket),
        )
        .route("/api/v1/tickets/{id}/comments", post(cases::comment_ticket))
        .route(
            "/api/v1/tickets/{id}/replies/{index}/seen",
            put(cases::mark_ticket_seen),
        )
        // Service requests
        .route(
            "/api/v1/service-requests",
            get(cases::list_service_requests).post(cases::create_service_request),
        )
        .route(
            "/api/v1/service-requests/{id}",
            get(cases::get_service_request).put(cases::update_service_request),
        )
        .route(
            "/api/v1/service-requests/{id}/comments",
            post(cases::comment_service_request),
        )
        .route(
            "/api/v1/service-requests/{id}/replies/{index}/seen",
            put(cases::mark_service_request_seen),
        )
        // User administration
        .route("/api/v1/users", get(users::list_users))
        .route(
            "/api/v1/users/{id}",
            get(users::get_user).delete(users::delete_user),
        )
        .route("/api/v1/audit-events", get(users::list_audit_events))
}
