pub mod templates;

use std::future::Future;

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::models::{Case, CaseKind, User};

/// Notification transport failure. Always caught at the spawn boundary and
/// logged; it never reaches the caller of the triggering request.
#[derive(Debug)]
pub struct DeliveryError(String);

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for DeliveryError {}

/// Run a notification send as a detached task. Delivery is at-most-once and
/// best-effort: the response path never awaits it, failures only hit the log,
/// and there is no retry.
pub fn spawn_delivery<F>(what: &'static str, fut: F)
where
    F: Future<Output = Result<(), DeliveryError>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = fut.await {
            tracing::error!("Failed to send {what} notification: {e}");
        }
    });
}

pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl Mailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, DeliveryError> {
        let creds = Credentials::new(config.user.clone(), config.pass.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| DeliveryError(format!("SMTP transport error: {e}")))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }

    /// New-case alert to the configured admin address.
    pub async fn send_new_case_alert(
        &self,
        admin_email: &str,
        kind: CaseKind,
        case: &Case,
        owner: &User,
    ) -> Result<(), DeliveryError> {
        let subject = format!("New {} Created: {}", kind.title_label(), case.case_id);
        let html = templates::render_new_case_alert(kind, case, owner);
        self.send(admin_email, &subject, &html).await
    }

    /// Creation confirmation to the submitter.
    pub async fn send_case_confirmation(
        &self,
        kind: CaseKind,
        case: &Case,
        owner: &User,
    ) -> Result<(), DeliveryError> {
        let subject = format!("{} Confirmation: {}", kind.title_label(), case.case_id);
        let html = templates::render_case_confirmation(kind, case, owner);
        self.send(&owner.email, &subject, &html).await
    }

    /// Admin reply, status change or closure notice to the submitter.
    pub async fn send_case_update(
        &self,
        kind: CaseKind,
        case: &Case,
        owner: &User,
        note: &str,
        closing: bool,
    ) -> Result<(), DeliveryError> {
        let subject = if closing {
            format!(
                "Your {} has been resolved and closed",
                kind.label()
            )
        } else {
            format!("Admin Reply on {}: {}", kind.title_label(), case.case_id)
        };
        let html = templates::render_case_update(kind, case, owner, note);
        self.send(&owner.email, &subject, &html).await
    }

    pub async fn send_password_reset(
        &self,
        to_email: &str,
        reset_url: &str,
    ) -> Result<(), DeliveryError> {
        let html = templates::render_password_reset(reset_url);
        self.send(to_email, "Password Reset - ServiceDesk", &html).await
    }

    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), DeliveryError> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| DeliveryError(format!("Invalid from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| DeliveryError(format!("Invalid to address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| DeliveryError(format!("Failed to build email: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| DeliveryError(format!("Failed to send email: {e}")))?;

        Ok(())
    }
}
