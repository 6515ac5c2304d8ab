use chrono::{DateTime, Utc};

use crate::models::{Case, CaseKind, Location, User};

/// Visit times are rendered in a fixed en-US style regardless of server
/// locale, e.g. "January 5, 2026, 03:04 PM".
pub fn format_visit_time(at: DateTime<Utc>) -> String {
    at.format("%B %-d, %Y, %I:%M %p").to_string()
}

pub fn maps_link(location: &Location) -> String {
    format!(
        "https://www.google.com/maps?q={},{}",
        location.lat, location.lng
    )
}

pub fn render_new_case_alert(kind: CaseKind, case: &Case, owner: &User) -> String {
    let preferred = case
        .preferred_visit_at
        .map(|at| {
            format!(
                "<p><strong>Preferred Visit Time:</strong> {}</p>",
                format_visit_time(at)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2>ServiceDesk - New {title_label} Created</h2>
    <p><strong>{title_label} ID:</strong> {case_id}</p>
    <p><strong>Category:</strong> {category}</p>
    <p><strong>Title:</strong> {title}</p>
    <p><strong>Name:</strong> {name}</p>
    <p><strong>Company:</strong> {company}</p>
    <p><strong>Description:</strong></p>
    <p style="background: #f9fafb; padding: 12px; border-radius: 4px;">{description}</p>
    <p style="color: #666; font-size: 14px;"><strong>Email:</strong> {email}</p>
    <p style="color: #666; font-size: 14px;"><strong>Phone:</strong> {phone}</p>
    {preferred}
    <p><a href="{maps}" style="color: #0070f3; text-decoration: none;">View Location on Google Maps</a></p>
</body>
</html>"#,
        title_label = kind.title_label(),
        case_id = case.case_id,
        category = case.category,
        title = case.title,
        name = owner.name,
        company = owner.company_name,
        description = case.description,
        email = owner.email,
        phone = owner.phone,
        preferred = preferred,
        maps = maps_link(&case.location),
    )
}

pub fn render_case_confirmation(kind: CaseKind, case: &Case, owner: &User) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2>{title_label} Created Successfully</h2>
    <p>Dear {name},</p>
    <p>Your {label} has been created successfully.</p>
    <p><strong>{title_label} ID:</strong> {case_id}</p>
    <p><strong>Category:</strong> {category}</p>
    <p><strong>Title:</strong> {title}</p>
    <p><strong>Status:</strong> {status}</p>
    <p>We will review your {label} and get back to you soon.</p>
</body>
</html>"#,
        title_label = kind.title_label(),
        label = kind.label(),
        name = owner.name,
        case_id = case.case_id,
        category = case.category,
        title = case.title,
        status = case.status,
    )
}

/// Admin reply / status change / closure notice. The note is the composed
/// change summary or the admin's comment text.
pub fn render_case_update(kind: CaseKind, case: &Case, owner: &User, note: &str) -> String {
    let visit_info = case
        .assigned_visit_at
        .map(|at| {
            format!(
                r#"<p style="background: #fef3c7; padding: 12px; border-radius: 4px;"><strong>Scheduled Visit Time:</strong> {}</p>"#,
                format_visit_time(at)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2>ServiceDesk - {title_label} Update</h2>
    <p>Dear {name},</p>
    <p>You have received an update from our admin team regarding your {label}.</p>
    <p><strong>{title_label} ID:</strong> {case_id}</p>
    <p><strong>Category:</strong> {category}</p>
    <p><strong>Title:</strong> {title}</p>
    <p><strong>Current Status:</strong> {status}</p>
    {visit_info}
    <h3>Admin Reply:</h3>
    <p style="background: #eff6ff; padding: 12px; border-radius: 4px; white-space: pre-wrap;">{note}</p>
    <p style="color: #666; font-size: 14px;">You can view all updates on your {label} in your dashboard.</p>
</body>
</html>"#,
        title_label = kind.title_label(),
        label = kind.label(),
        name = owner.name,
        case_id = case.case_id,
        category = case.category,
        title = case.title,
        status = case.status,
        visit_info = visit_info,
        note = note.replace('\n', "<br>"),
    )
}

pub fn render_password_reset(reset_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2>Password Reset</h2>
    <p>A password reset was requested for your ServiceDesk account.</p>
    <p><a href="{reset_url}" style="display: inline-block; padding: 10px 20px; background: #0070f3; color: white; text-decoration: none; border-radius: 4px;">Reset Password</a></p>
    <p style="color: #666; font-size: 14px;">This link expires in 1 hour. If you didn't request this, you can ignore it.</p>
</body>
</html>"#
    )
}
