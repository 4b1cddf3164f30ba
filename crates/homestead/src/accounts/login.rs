use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use super::domain::{EmailAddress, User};
use super::mailer::{verification_code_email, EmailSender, MailError};
use super::repository::{RepositoryError, UserRepository};
use super::verification::{
    VerificationError, VerificationIssuer, VerificationKind, VerificationStore,
};
use crate::forms::FormErrors;

pub const UNKNOWN_ACCOUNT: &str = "No account is registered with that email.";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub redirect_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequested {
    pub email: EmailAddress,
    /// Code entry form, carrying the sanitized post-login destination.
    pub redirect_to: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("invalid submission: {0}")]
    Validation(FormErrors),
    #[error(transparent)]
    Mail(#[from] MailError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<VerificationError> for LoginError {
    fn from(value: VerificationError) -> Self {
        match value {
            VerificationError::Store(err) => Self::Repository(err),
            other => Self::Validation(FormErrors::field("code", other.to_string())),
        }
    }
}

/// Passwordless login: a one-time code emailed to the account address.
pub struct LoginService<U, V, M> {
    users: Arc<U>,
    issuer: Arc<VerificationIssuer<V>>,
    mailer: Arc<M>,
}

impl<U, V, M> LoginService<U, V, M>
where
    U: UserRepository + 'static,
    V: VerificationStore + 'static,
    M: EmailSender + 'static,
{
    pub fn new(users: Arc<U>, issuer: Arc<VerificationIssuer<V>>, mailer: Arc<M>) -> Self {
        Self {
            users,
            issuer,
            mailer,
        }
    }

    pub async fn request(
        &self,
        form: &LoginForm,
        now: DateTime<Utc>,
    ) -> Result<LoginRequested, LoginError> {
        let email = EmailAddress::parse(&form.email)
            .map_err(|message| LoginError::Validation(FormErrors::field("email", message)))?;

        if self.users.find_user_by_email(&email)?.is_none() {
            warn!("login requested for unknown address");
            return Err(LoginError::Validation(FormErrors::field(
                "email",
                UNKNOWN_ACCOUNT,
            )));
        }

        let prepared = self
            .issuer
            .prepare(VerificationKind::Login, email.as_str(), now)?;
        let message = verification_code_email(
            email.clone(),
            "Your Homestead login code",
            "Use this code to finish signing in to Homestead.",
            &prepared.otp,
            &prepared.verify_url,
        );
        self.mailer.send(message).await?;

        let mut redirect_to = prepared.redirect_to;
        if let Some(destination) = form.redirect_to.as_deref().and_then(safe_redirect) {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .append_pair("redirect_to", destination)
                .finish();
            redirect_to.push('&');
            redirect_to.push_str(&query);
        }

        info!("login code sent");
        Ok(LoginRequested { email, redirect_to })
    }

    /// Consume a login code. The account's address counts as verified afterwards.
    pub fn confirm(&self, target: &str, code: &str, now: DateTime<Utc>) -> Result<User, LoginError> {
        let email = EmailAddress::parse(target)
            .map_err(|_| LoginError::Validation(FormErrors::field("code", "Invalid code")))?;

        self.issuer
            .validate(VerificationKind::Login, email.as_str(), code, now)?;

        let Some(mut user) = self.users.find_user_by_email(&email)? else {
            return Err(LoginError::Validation(FormErrors::form(UNKNOWN_ACCOUNT)));
        };
        if !user.email_verified {
            self.users.mark_email_verified(&user.id)?;
            user.email_verified = true;
        }

        info!(user_id = %user.id, "login verified");
        Ok(user)
    }
}

/// Accept only same-origin relative paths as post-login destinations.
pub fn safe_redirect(candidate: &str) -> Option<&str> {
    let candidate = candidate.trim();
    let is_relative = candidate.starts_with('/')
        && !candidate.starts_with("//")
        && !candidate.starts_with("/\\")
        && !candidate.chars().any(char::is_control);
    is_relative.then_some(candidate)
}
