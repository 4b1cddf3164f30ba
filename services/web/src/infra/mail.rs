use std::time::Duration;

use async_trait::async_trait;
use homestead::accounts::{EmailMessage, EmailSender, MailError};
use homestead::config::MailConfig;
use serde::Serialize;
use tracing::{info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Writes messages to the log instead of delivering them. Used whenever no
/// provider API key is configured.
#[derive(Debug, Clone)]
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl EmailSender for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        info!(
            from = %self.from,
            to = %message.to,
            subject = %message.subject,
            body = %message.text,
            "email delivery disabled; message logged"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct OutboundEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
    html: &'a str,
}

/// Delivers through a JSON email API authenticated with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpMailer {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
            from: from.into(),
        }
    }
}

#[async_trait]
impl EmailSender for HttpMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        let payload = OutboundEmail {
            from: &self.from,
            to: [message.to.as_str()],
            subject: &message.subject,
            text: &message.text,
            html: &message.html,
        };

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                warn!(error = %err, "email provider unreachable");
                MailError::Transport(err.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            info!(to = %message.to, subject = %message.subject, "email sent");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let message = provider_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
        warn!(status = status.as_u16(), %message, "email provider rejected message");
        Err(MailError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

/// Pull a human readable reason out of a provider error body: the JSON
/// `message` field when present, otherwise the raw text.
fn provider_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) => value
            .get("message")
            .and_then(|message| message.as_str())
            .map(str::to_string)
            .or_else(|| Some(trimmed.to_string())),
        Err(_) => Some(trimmed.to_string()),
    }
}

/// The sender selected from configuration.
#[derive(Debug, Clone)]
pub enum Mailer {
    Log(LogMailer),
    Http(HttpMailer),
}

impl Mailer {
    pub fn from_config(config: &MailConfig) -> Self {
        match &config.api_key {
            Some(key) => Self::Http(HttpMailer::new(&config.api_url, key, &config.from)),
            None => Self::Log(LogMailer::new(&config.from)),
        }
    }
}

#[async_trait]
impl EmailSender for Mailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        match self {
            Mailer::Log(mailer) => mailer.send(message).await,
            Mailer::Http(mailer) => mailer.send(message).await,
        }
    }
}
