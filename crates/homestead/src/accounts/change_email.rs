use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use super::domain::{EmailAddress, User};
use super::mailer::{verification_code_email, EmailMessage, EmailSender, MailError};
use super::repository::{RepositoryError, UserRepository};
use super::verification::{
    VerificationError, VerificationIssuer, VerificationKind, VerificationStore,
};
use crate::forms::FormErrors;

pub const EMAIL_IN_USE: &str = "This email is already in use.";
pub const SAME_DEVICE_REQUIRED: &str =
    "You must submit the code on the same device that requested the email change.";

/// Submitted body of the change-email form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeEmailForm {
    #[serde(default)]
    pub email: String,
}

/// A verification code is on its way to `new_email`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEmailRequested {
    pub new_email: EmailAddress,
    pub redirect_to: String,
    pub expires_at: DateTime<Utc>,
}

/// The address was swapped; `previous_email` has been notified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEmailConfirmed {
    pub user: User,
    pub previous_email: EmailAddress,
}

#[derive(Debug, thiserror::Error)]
pub enum ChangeEmailError {
    #[error("invalid submission: {0}")]
    Validation(FormErrors),
    #[error(transparent)]
    Mail(#[from] MailError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<VerificationError> for ChangeEmailError {
    fn from(value: VerificationError) -> Self {
        match value {
            VerificationError::Store(err) => Self::Repository(err),
            other => Self::Validation(FormErrors::field("code", other.to_string())),
        }
    }
}

/// Email change: issue a code to the new address, then swap on confirmation.
pub struct ChangeEmailService<U, V, M> {
    users: Arc<U>,
    issuer: Arc<VerificationIssuer<V>>,
    mailer: Arc<M>,
}

impl<U, V, M> ChangeEmailService<U, V, M>
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

    /// Validate the new address, issue a `change-email` code for the user and
    /// send it. Nothing about the user changes until [`Self::confirm`].
    pub async fn request(
        &self,
        user: &User,
        form: &ChangeEmailForm,
        now: DateTime<Utc>,
    ) -> Result<ChangeEmailRequested, ChangeEmailError> {
        let new_email = EmailAddress::parse(&form.email)
            .map_err(|message| ChangeEmailError::Validation(FormErrors::field("email", message)))?;

        if self.users.find_user_by_email(&new_email)?.is_some() {
            warn!(user_id = %user.id, "email change rejected: address in use");
            return Err(ChangeEmailError::Validation(FormErrors::field(
                "email",
                EMAIL_IN_USE,
            )));
        }

        let prepared = self
            .issuer
            .prepare(VerificationKind::ChangeEmail, &user.id.0, now)?;

        let message = verification_code_email(
            new_email.clone(),
            "Homestead email change verification",
            "You requested to change the email address on your Homestead account.",
            &prepared.otp,
            &prepared.verify_url,
        );
        if let Err(err) = self.mailer.send(message).await {
            warn!(user_id = %user.id, error = %err, "change-email verification not delivered");
            return Err(err.into());
        }

        info!(user_id = %user.id, "email change verification sent");
        Ok(ChangeEmailRequested {
            new_email,
            redirect_to: prepared.redirect_to,
            expires_at: prepared.expires_at,
        })
    }

    /// Consume the code and move the user to the pending address held by the
    /// requesting device.
    pub async fn confirm(
        &self,
        user: &User,
        pending: Option<EmailAddress>,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<ChangeEmailConfirmed, ChangeEmailError> {
        let Some(new_email) = pending else {
            return Err(ChangeEmailError::Validation(FormErrors::form(
                SAME_DEVICE_REQUIRED,
            )));
        };

        self.issuer
            .validate(VerificationKind::ChangeEmail, &user.id.0, code, now)?;

        let updated = match self.users.update_email(&user.id, &new_email) {
            Ok(updated) => updated,
            Err(RepositoryError::Conflict) => {
                return Err(ChangeEmailError::Validation(FormErrors::form(EMAIL_IN_USE)))
            }
            Err(err) => return Err(err.into()),
        };
        info!(user_id = %user.id, "email address changed");

        let notice = change_notice(user.email.clone(), &new_email);
        if let Err(err) = self.mailer.send(notice).await {
            warn!(user_id = %user.id, error = %err, "email change notice not delivered");
        }

        Ok(ChangeEmailConfirmed {
            user: updated,
            previous_email: user.email.clone(),
        })
    }
}

fn change_notice(to: EmailAddress, new_email: &EmailAddress) -> EmailMessage {
    let text = format!(
        "Your Homestead email has been changed to {new_email}.\n\n\
         If you did not make this change, contact support immediately."
    );
    let html = format!(
        "<p>Your Homestead email has been changed to <strong>{}</strong>.</p>\
         <p>If you did not make this change, contact support immediately.</p>",
        crate::html::escape(new_email.as_str())
    );
    EmailMessage {
        to,
        subject: "Your Homestead email has been changed".to_string(),
        text,
        html,
    }
}
