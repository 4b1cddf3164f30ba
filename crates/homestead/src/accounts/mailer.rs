use serde::Serialize;

use super::domain::EmailAddress;

/// Rendered email ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: EmailAddress,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Outbound email transport. Implementations live with the infrastructure.
#[async_trait::async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}

/// Email dispatch error. The message is surfaced to the user verbatim.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MailError {
    #[error("email transport unavailable: {0}")]
    Transport(String),
    #[error("email provider rejected the message ({status}): {message}")]
    Rejected { status: u16, message: String },
}

pub(crate) fn verification_code_email(
    to: EmailAddress,
    subject: &str,
    intro: &str,
    otp: &str,
    verify_url: &str,
) -> EmailMessage {
    let text = format!(
        "{intro}\n\nHere's your verification code: {otp}\n\nOr open this link: {verify_url}\n"
    );
    let html = format!(
        "<p>{}</p><p>Here's your verification code: <strong>{}</strong></p>\
         <p>Or click the link below:</p><p><a href=\"{}\">{}</a></p>",
        crate::html::escape(intro),
        crate::html::escape(otp),
        crate::html::escape(verify_url),
        crate::html::escape(verify_url),
    );

    EmailMessage {
        to,
        subject: subject.to_string(),
        text,
        html,
    }
}
