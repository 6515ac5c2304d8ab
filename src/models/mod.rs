pub mod audit_event;
pub mod case;
pub mod user;

pub use audit_event::AuditEvent;
pub use case::{Case, CaseKind, CaseStatus, CaseWithOwner, TimelineEntry};
pub use user::{Location, Outlet, User, UserSummary};
