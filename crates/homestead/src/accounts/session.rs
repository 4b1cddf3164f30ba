//! Signed cookie sessions.
//!
//! Cookie values are `<base64url(json)>.<base64url(hmac-sha256)>`. Anything
//! that fails to decode, verify, or has expired is treated as no session.

use axum::http::header::{HeaderMap, HeaderValue, COOKIE};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::domain::{EmailAddress, UserId};

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "hs_session";
pub const VERIFICATION_COOKIE: &str = "hs_verification";

const SESSION_LIFETIME_DAYS: i64 = 30;

/// Authenticated browser session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

impl SessionData {
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            expires_at: now + Duration::days(SESSION_LIFETIME_DAYS),
        }
    }
}

/// Short-lived state tied to the device that requested a verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSession {
    pub new_email: EmailAddress,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("malformed session cookie")]
    Malformed,
    #[error("session signature mismatch")]
    Signature,
    #[error("session expired")]
    Expired,
    #[error("session payload could not be encoded: {0}")]
    Encoding(#[from] serde_json::Error),
}

trait Expiring {
    fn expires_at(&self) -> DateTime<Utc>;
}

impl Expiring for SessionData {
    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl Expiring for VerificationSession {
    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// Signs and verifies cookie payloads and builds `Set-Cookie` headers.
#[derive(Clone)]
pub struct SessionCodec {
    key: Vec<u8>,
    secure: bool,
}

impl SessionCodec {
    pub fn new(secret: &str, secure: bool) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
            secure,
        }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length")
    }

    pub fn sign<T: Serialize>(&self, payload: &T) -> Result<String, SessionError> {
        let json = serde_json::to_vec(payload)?;
        let mut mac = self.mac();
        mac.update(&json);
        let signature = mac.finalize().into_bytes();
        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&json),
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    pub fn verify<T: DeserializeOwned>(&self, value: &str) -> Result<T, SessionError> {
        let (payload, signature) = value.split_once('.').ok_or(SessionError::Malformed)?;
        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| SessionError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| SessionError::Malformed)?;

        let mut mac = self.mac();
        mac.update(&json);
        mac.verify_slice(&signature)
            .map_err(|_| SessionError::Signature)?;

        serde_json::from_slice(&json).map_err(|_| SessionError::Malformed)
    }

    fn read<T>(&self, headers: &HeaderMap, name: &str, now: DateTime<Utc>) -> Option<T>
    where
        T: DeserializeOwned + Expiring,
    {
        let raw = cookie_value(headers, name)?;
        match self.verify::<T>(raw) {
            Ok(payload) if payload.expires_at() > now => Some(payload),
            Ok(_) => {
                tracing::debug!(cookie = name, "ignoring expired cookie");
                None
            }
            Err(err) => {
                tracing::warn!(cookie = name, error = %err, "ignoring invalid cookie");
                None
            }
        }
    }

    pub fn read_session(&self, headers: &HeaderMap, now: DateTime<Utc>) -> Option<SessionData> {
        self.read(headers, SESSION_COOKIE, now)
    }

    pub fn read_verification(
        &self,
        headers: &HeaderMap,
        now: DateTime<Utc>,
    ) -> Option<VerificationSession> {
        self.read(headers, VERIFICATION_COOKIE, now)
    }

    pub fn session_cookie(
        &self,
        session: &SessionData,
        now: DateTime<Utc>,
    ) -> Result<HeaderValue, SessionError> {
        let max_age = (session.expires_at - now).num_seconds().max(0);
        self.set_cookie(SESSION_COOKIE, &self.sign(session)?, max_age)
    }

    pub fn verification_cookie(
        &self,
        session: &VerificationSession,
        now: DateTime<Utc>,
    ) -> Result<HeaderValue, SessionError> {
        let max_age = (session.expires_at - now).num_seconds().max(0);
        self.set_cookie(VERIFICATION_COOKIE, &self.sign(session)?, max_age)
    }

    pub fn clear_cookie(&self, name: &str) -> Result<HeaderValue, SessionError> {
        self.set_cookie(name, "", 0)
    }

    fn set_cookie(&self, name: &str, value: &str, max_age: i64) -> Result<HeaderValue, SessionError> {
        let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie).map_err(|_| SessionError::Malformed)
    }
}

/// First value of the named cookie across all `Cookie` headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}
