use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::repository::RepositoryError;

pub const CODE_LENGTH: usize = 6;

/// Wrong guesses allowed before the pending code is discarded.
pub const MAX_ATTEMPTS: u32 = 5;

/// What a verification code unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationKind {
    Login,
    ChangeEmail,
}

impl VerificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::ChangeEmail => "change-email",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "login" => Some(Self::Login),
            "change-email" => Some(Self::ChangeEmail),
            _ => None,
        }
    }
}

impl fmt::Display for VerificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored verification. Only the digest of the code is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub kind: VerificationKind,
    pub target: String,
    pub code_digest: String,
    pub expires_at: DateTime<Utc>,
    /// Failed guesses against this code so far.
    pub attempts: u32,
}

/// Persistence for pending verifications, unique per `(kind, target)`.
pub trait VerificationStore: Send + Sync {
    /// Insert or replace the verification for `(kind, target)`, resetting its
    /// attempt count.
    fn upsert_verification(&self, verification: Verification) -> Result<(), RepositoryError>;
    fn fetch_verification(
        &self,
        kind: VerificationKind,
        target: &str,
    ) -> Result<Option<Verification>, RepositoryError>;
    fn delete_verification(&self, kind: VerificationKind, target: &str)
        -> Result<(), RepositoryError>;
    /// Remove the verification for `(kind, target)` only if its digest is
    /// `code_digest`, returning the removed record. Check and removal happen
    /// as one operation so a code can be consumed at most once.
    fn consume_verification(
        &self,
        kind: VerificationKind,
        target: &str,
        code_digest: &str,
    ) -> Result<Option<Verification>, RepositoryError>;
    /// Count a failed guess and remove the verification once `max_attempts`
    /// is reached. Returns the new count, or `None` when nothing is pending.
    fn record_failed_attempt(
        &self,
        kind: VerificationKind,
        target: &str,
        max_attempts: u32,
    ) -> Result<Option<u32>, RepositoryError>;
}

/// Everything the caller needs to deliver a freshly issued code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedVerification {
    pub otp: String,
    /// Absolute link that submits the code directly.
    pub verify_url: String,
    /// Relative location of the code entry form.
    pub redirect_to: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("Invalid code")]
    Invalid,
    #[error("This code has expired")]
    Expired,
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

/// Issues and checks one-time codes against a [`VerificationStore`].
pub struct VerificationIssuer<S> {
    store: Arc<S>,
    ttl: Duration,
    base_url: String,
}

impl<S> VerificationIssuer<S>
where
    S: VerificationStore + 'static,
{
    pub fn new(store: Arc<S>, ttl: Duration, base_url: impl Into<String>) -> Self {
        Self {
            store,
            ttl,
            base_url: base_url.into(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a new code for `(kind, target)`, replacing any outstanding one.
    pub fn prepare(
        &self,
        kind: VerificationKind,
        target: &str,
        now: DateTime<Utc>,
    ) -> Result<PreparedVerification, VerificationError> {
        let otp = generate_code();
        let expires_at = now + self.ttl;

        self.store.upsert_verification(Verification {
            kind,
            target: target.to_string(),
            code_digest: digest(&otp),
            expires_at,
            attempts: 0,
        })?;

        let redirect_to = verify_path(kind, target, None);
        let verify_url = format!("{}{}", self.base_url, verify_path(kind, target, Some(&otp)));

        tracing::debug!(kind = %kind, %expires_at, "verification prepared");

        Ok(PreparedVerification {
            otp,
            verify_url,
            redirect_to,
            expires_at,
        })
    }

    /// Check a submitted code. A matching, unexpired code is consumed; a
    /// mismatch counts against [`MAX_ATTEMPTS`].
    pub fn validate(
        &self,
        kind: VerificationKind,
        target: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<(), VerificationError> {
        let code = code.trim();
        if code.len() != CODE_LENGTH || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(VerificationError::Invalid);
        }

        if let Some(consumed) = self.store.consume_verification(kind, target, &digest(code))? {
            if now >= consumed.expires_at {
                return Err(VerificationError::Expired);
            }
            return Ok(());
        }

        let Some(stored) = self.store.fetch_verification(kind, target)? else {
            return Err(VerificationError::Invalid);
        };

        if now >= stored.expires_at {
            self.store.delete_verification(kind, target)?;
            return Err(VerificationError::Expired);
        }

        if let Some(attempts) = self.store.record_failed_attempt(kind, target, MAX_ATTEMPTS)? {
            if attempts >= MAX_ATTEMPTS {
                tracing::warn!(
                    kind = %kind,
                    attempts,
                    "verification discarded after repeated failures"
                );
            }
        }
        Err(VerificationError::Invalid)
    }
}

/// Build the `/verify` location for a kind and target, optionally with the code.
pub fn verify_path(kind: VerificationKind, target: &str, code: Option<&str>) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("type", kind.as_str());
    query.append_pair("target", target);
    if let Some(code) = code {
        query.append_pair("code", code);
    }
    format!("/verify?{}", query.finish())
}

fn generate_code() -> String {
    let value: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{value:0width$}", width = CODE_LENGTH)
}

fn digest(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}
