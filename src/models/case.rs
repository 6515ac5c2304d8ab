use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::user::{Location, UserSummary};

/// Tickets and service requests are structurally identical and live in two
/// independent tables; the kind selects the table, the human-readable id
/// prefix, the display wording and the terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseKind {
    Ticket,
    ServiceRequest,
}

impl CaseKind {
    pub fn table(self) -> &'static str {
        match self {
            CaseKind::Ticket => "tickets",
            CaseKind::ServiceRequest => "service_requests",
        }
    }

    pub fn id_prefix(self) -> &'static str {
        match self {
            CaseKind::Ticket => "TKT",
            CaseKind::ServiceRequest => "SR",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CaseKind::Ticket => "ticket",
            CaseKind::ServiceRequest => "service request",
        }
    }

    pub fn title_label(self) -> &'static str {
        match self {
            CaseKind::Ticket => "Ticket",
            CaseKind::ServiceRequest => "Service Request",
        }
    }

    /// Snake-case key used in audit actions.
    pub fn key(self) -> &'static str {
        match self {
            CaseKind::Ticket => "ticket",
            CaseKind::ServiceRequest => "service_request",
        }
    }

    /// The status that closes out a case of this kind and triggers the
    /// closing notification.
    pub fn closing_status(self) -> CaseStatus {
        match self {
            CaseKind::Ticket => CaseStatus::Closed,
            CaseKind::ServiceRequest => CaseStatus::Completed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseStatus {
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    Closed,
    Completed,
}

impl CaseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CaseStatus::Open => "Open",
            CaseStatus::InProgress => "In Progress",
            CaseStatus::Closed => "Closed",
            CaseStatus::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only timeline entry. Entries are never edited or removed;
/// `seen_by` only ever grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub note: String,
    pub added_by: String,
    pub seen_by: Vec<Uuid>,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Case {
    pub id: Uuid,
    pub case_id: String,
    pub user_id: Uuid,
    pub category: String,
    pub title: String,
    pub description: String,
    pub images: Vec<String>,
    #[sqlx(flatten)]
    pub location: Location,
    pub preferred_visit_at: Option<DateTime<Utc>>,
    pub assigned_visit_at: Option<DateTime<Utc>>,
    pub status: String,
    pub timeline: Json<Vec<TimelineEntry>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Case response shape with the owner profile joined in.
#[derive(Debug, Serialize)]
pub struct CaseWithOwner {
    #[serde(flatten)]
    pub case: Case,
    pub owner: Option<UserSummary>,
}
