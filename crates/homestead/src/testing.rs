//! In-memory fakes shared by the unit test modules.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, HeaderValue, Request};
use axum::response::Response;
use chrono::{TimeZone, Utc};

use crate::accounts::{
    EmailAddress, EmailMessage, EmailSender, MailError, RepositoryError, SessionCodec,
    SessionData, User, UserId, UserRepository, Verification, VerificationKind, VerificationStore,
};
use crate::config::AccountsConfig;
use crate::properties::{
    MaintenanceRequest, MaintenanceRequestId, MaintenanceStatus, Organization, OrganizationId,
    OrganizationRepository, Property, PropertyId,
};
use crate::web::PortalState;

pub(crate) const TEST_SECRET: &str = "unit-test-session-secret-0123456789abcdef";

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    verifications: HashMap<(VerificationKind, String), Verification>,
    organizations: Vec<Organization>,
    properties: Vec<Property>,
    maintenance: Vec<MaintenanceRequest>,
}

#[derive(Default, Clone)]
pub(crate) struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub(crate) fn verification(&self, kind: VerificationKind, target: &str) -> Option<Verification> {
        let guard = self.tables.lock().expect("store mutex poisoned");
        guard.verifications.get(&(kind, target.to_string())).cloned()
    }

    pub(crate) fn user(&self, id: &UserId) -> Option<User> {
        let guard = self.tables.lock().expect("store mutex poisoned");
        guard.users.get(id).cloned()
    }
}

impl UserRepository for MemoryStore {
    fn insert_user(&self, user: User) -> Result<User, RepositoryError> {
        let mut guard = self.tables.lock().expect("store mutex poisoned");
        if guard.users.values().any(|existing| existing.email == user.email)
            || guard.users.contains_key(&user.id)
        {
            return Err(RepositoryError::Conflict);
        }
        guard.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    fn fetch_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.user(id))
    }

    fn find_user_by_email(&self, email: &EmailAddress) -> Result<Option<User>, RepositoryError> {
        let guard = self.tables.lock().expect("store mutex poisoned");
        Ok(guard.users.values().find(|user| &user.email == email).cloned())
    }

    fn update_email(&self, id: &UserId, email: &EmailAddress) -> Result<User, RepositoryError> {
        let mut guard = self.tables.lock().expect("store mutex poisoned");
        if guard
            .users
            .values()
            .any(|user| &user.email == email && &user.id != id)
        {
            return Err(RepositoryError::Conflict);
        }
        let user = guard.users.get_mut(id).ok_or(RepositoryError::NotFound)?;
        user.email = email.clone();
        user.email_verified = true;
        Ok(user.clone())
    }

    fn mark_email_verified(&self, id: &UserId) -> Result<(), RepositoryError> {
        let mut guard = self.tables.lock().expect("store mutex poisoned");
        let user = guard.users.get_mut(id).ok_or(RepositoryError::NotFound)?;
        user.email_verified = true;
        Ok(())
    }
}

impl VerificationStore for MemoryStore {
    fn upsert_verification(&self, verification: Verification) -> Result<(), RepositoryError> {
        let mut guard = self.tables.lock().expect("store mutex poisoned");
        guard.verifications.insert(
            (verification.kind, verification.target.clone()),
            verification,
        );
        Ok(())
    }

    fn fetch_verification(
        &self,
        kind: VerificationKind,
        target: &str,
    ) -> Result<Option<Verification>, RepositoryError> {
        Ok(self.verification(kind, target))
    }

    fn delete_verification(
        &self,
        kind: VerificationKind,
        target: &str,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.tables.lock().expect("store mutex poisoned");
        guard.verifications.remove(&(kind, target.to_string()));
        Ok(())
    }

    fn consume_verification(
        &self,
        kind: VerificationKind,
        target: &str,
        code_digest: &str,
    ) -> Result<Option<Verification>, RepositoryError> {
        let mut guard = self.tables.lock().expect("store mutex poisoned");
        let key = (kind, target.to_string());
        match guard.verifications.get(&key) {
            Some(stored) if stored.code_digest == code_digest => {
                Ok(guard.verifications.remove(&key))
            }
            _ => Ok(None),
        }
    }

    fn record_failed_attempt(
        &self,
        kind: VerificationKind,
        target: &str,
        max_attempts: u32,
    ) -> Result<Option<u32>, RepositoryError> {
        let mut guard = self.tables.lock().expect("store mutex poisoned");
        let key = (kind, target.to_string());
        let Some(stored) = guard.verifications.get_mut(&key) else {
            return Ok(None);
        };
        stored.attempts += 1;
        let attempts = stored.attempts;
        if attempts >= max_attempts {
            guard.verifications.remove(&key);
        }
        Ok(Some(attempts))
    }
}

impl OrganizationRepository for MemoryStore {
    fn insert_organization(
        &self,
        organization: Organization,
    ) -> Result<Organization, RepositoryError> {
        let mut guard = self.tables.lock().expect("store mutex poisoned");
        guard.organizations.push(organization.clone());
        Ok(organization)
    }

    fn fetch_organization(
        &self,
        id: &OrganizationId,
    ) -> Result<Option<Organization>, RepositoryError> {
        let guard = self.tables.lock().expect("store mutex poisoned");
        Ok(guard.organizations.iter().find(|org| &org.id == id).cloned())
    }

    fn organizations_for_owner(
        &self,
        owner: &UserId,
    ) -> Result<Vec<Organization>, RepositoryError> {
        let guard = self.tables.lock().expect("store mutex poisoned");
        Ok(guard
            .organizations
            .iter()
            .filter(|org| &org.owner_id == owner)
            .cloned()
            .collect())
    }

    fn insert_property(&self, property: Property) -> Result<Property, RepositoryError> {
        let mut guard = self.tables.lock().expect("store mutex poisoned");
        guard.properties.push(property.clone());
        Ok(property)
    }

    fn fetch_property(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError> {
        let guard = self.tables.lock().expect("store mutex poisoned");
        Ok(guard.properties.iter().find(|p| &p.id == id).cloned())
    }

    fn properties_for_organization(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<Property>, RepositoryError> {
        let guard = self.tables.lock().expect("store mutex poisoned");
        Ok(guard
            .properties
            .iter()
            .filter(|p| &p.organization_id == organization)
            .cloned()
            .collect())
    }

    fn insert_maintenance_request(
        &self,
        request: MaintenanceRequest,
    ) -> Result<MaintenanceRequest, RepositoryError> {
        let mut guard = self.tables.lock().expect("store mutex poisoned");
        guard.maintenance.push(request.clone());
        Ok(request)
    }

    fn maintenance_requests_for_property(
        &self,
        property: &PropertyId,
    ) -> Result<Vec<MaintenanceRequest>, RepositoryError> {
        let guard = self.tables.lock().expect("store mutex poisoned");
        Ok(guard
            .maintenance
            .iter()
            .rev()
            .filter(|r| &r.property_id == property)
            .cloned()
            .collect())
    }

    fn fetch_maintenance_request(
        &self,
        id: &MaintenanceRequestId,
    ) -> Result<Option<MaintenanceRequest>, RepositoryError> {
        let guard = self.tables.lock().expect("store mutex poisoned");
        Ok(guard.maintenance.iter().find(|r| &r.id == id).cloned())
    }

    fn update_maintenance_status(
        &self,
        id: &MaintenanceRequestId,
        status: MaintenanceStatus,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.tables.lock().expect("store mutex poisoned");
        let request = guard
            .maintenance
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or(RepositoryError::NotFound)?;
        request.status = status;
        Ok(())
    }
}

/// Records every message; optionally fails every send.
#[derive(Default, Clone)]
pub(crate) struct MemoryMailer {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
    failure: Option<MailError>,
}

impl MemoryMailer {
    pub(crate) fn failing(error: MailError) -> Self {
        Self {
            sent: Arc::default(),
            failure: Some(error),
        }
    }

    pub(crate) fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }

    /// The six-digit code from the most recent message.
    pub(crate) fn last_code(&self) -> Option<String> {
        let sent = self.sent();
        let text = &sent.last()?.text;
        let start = text.find("verification code: ")? + "verification code: ".len();
        Some(text[start..start + 6].to_string())
    }
}

#[async_trait::async_trait]
impl EmailSender for MemoryMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        self.sent.lock().expect("mailer mutex poisoned").push(message);
        Ok(())
    }
}

pub(crate) fn fixed_now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 1, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(crate) fn accounts_config() -> AccountsConfig {
    AccountsConfig {
        base_url: "http://homestead.test".to_string(),
        session_secret: TEST_SECRET.to_string(),
        verification_ttl_minutes: 10,
        secure_cookies: false,
    }
}

pub(crate) fn email(value: &str) -> EmailAddress {
    EmailAddress::parse(value).expect("valid test email")
}

pub(crate) fn seed_user(store: &MemoryStore, address: &str, verified: bool) -> User {
    let mut user = User::new(email(address), Some("Kelly".to_string()), fixed_now());
    user.email_verified = verified;
    store.insert_user(user).expect("user inserted")
}

pub(crate) fn portal_state(
    store: &MemoryStore,
    mailer: &MemoryMailer,
) -> Arc<PortalState<MemoryStore, MemoryMailer>> {
    Arc::new(PortalState::new(
        Arc::new(store.clone()),
        Arc::new(mailer.clone()),
        &accounts_config(),
    ))
}

/// `Cookie` header value carrying a signed session for the user.
pub(crate) fn session_cookie(user: &User) -> HeaderValue {
    let codec = SessionCodec::new(TEST_SECRET, false);
    let session = SessionData::new(user.id.clone(), Utc::now());
    let value = codec.sign(&session).expect("session signs");
    HeaderValue::from_str(&format!("hs_session={value}")).expect("cookie header")
}

pub(crate) fn get(path: &str, cookie: Option<&HeaderValue>) -> Request<Body> {
    let mut builder = Request::get(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("request builds")
}

pub(crate) fn post_form(path: &str, body: &str, cookie: Option<&HeaderValue>) -> Request<Body> {
    let mut builder = Request::post(path).header(
        header::CONTENT_TYPE,
        "application/x-www-form-urlencoded",
    );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

pub(crate) async fn read_body(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub(crate) fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("redirect location")
}

/// `name=value` pairs from the response's `Set-Cookie` headers.
pub(crate) fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(str::to_string)
        .collect()
}

pub(crate) fn cookie_headers(pairs: &[&str]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::COOKIE,
        HeaderValue::from_str(&pairs.join("; ")).expect("cookie header"),
    );
    headers
}
