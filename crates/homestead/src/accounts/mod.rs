//! Accounts: users, signed cookie sessions, one-time verification codes,
//! and the login and email-change flows built on them.

pub mod change_email;
pub mod domain;
pub mod login;
pub mod mailer;
pub mod repository;
pub mod router;
pub mod session;
pub mod verification;
mod views;

#[cfg(test)]
mod tests;

pub use change_email::{ChangeEmailError, ChangeEmailForm, ChangeEmailRequested, ChangeEmailService};
pub use domain::{EmailAddress, User, UserId};
pub use login::{LoginError, LoginForm, LoginRequested, LoginService};
pub use mailer::{EmailMessage, EmailSender, MailError};
pub use repository::{RepositoryError, UserRepository};
pub use router::account_router;
pub use session::{SessionCodec, SessionData, SessionError, VerificationSession};
pub use verification::{
    PreparedVerification, Verification, VerificationError, VerificationIssuer, VerificationKind,
    VerificationStore,
};
