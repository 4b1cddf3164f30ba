//! Shared request state and authentication for the HTML routers.

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Router;
use chrono::{DateTime, Utc};
use tracing::error;

use crate::accounts::{
    account_router, ChangeEmailService, EmailSender, LoginService, RepositoryError, SessionCodec,
    User, UserRepository, VerificationIssuer, VerificationStore,
};
use crate::config::AccountsConfig;
use crate::html;
use crate::pages::pages_router;
use crate::properties::{property_router, OrganizationRepository, PropertyService};

/// Everything a single backing store must provide to run the portal.
pub trait PortalStore: UserRepository + VerificationStore + OrganizationRepository + 'static {}

impl<T> PortalStore for T where T: UserRepository + VerificationStore + OrganizationRepository + 'static
{}

/// Services and codecs handed to every handler.
pub struct PortalState<S, M> {
    pub store: Arc<S>,
    pub sessions: SessionCodec,
    pub login: LoginService<S, S, M>,
    pub change_email: ChangeEmailService<S, S, M>,
    pub properties: PropertyService<S>,
}

impl<S, M> PortalState<S, M>
where
    S: PortalStore,
    M: EmailSender + 'static,
{
    pub fn new(store: Arc<S>, mailer: Arc<M>, config: &AccountsConfig) -> Self {
        let issuer = Arc::new(VerificationIssuer::new(
            store.clone(),
            config.verification_ttl(),
            config.base_url.clone(),
        ));

        Self {
            sessions: SessionCodec::new(&config.session_secret, config.secure_cookies),
            login: LoginService::new(store.clone(), issuer.clone(), mailer.clone()),
            change_email: ChangeEmailService::new(store.clone(), issuer, mailer),
            properties: PropertyService::new(store.clone()),
            store,
        }
    }

    /// The signed-in user, provided their address has been verified.
    pub fn current_user(
        &self,
        headers: &HeaderMap,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError> {
        let Some(session) = self.sessions.read_session(headers, now) else {
            return Ok(None);
        };
        let user = self.store.fetch_user(&session.user_id)?;
        Ok(user.filter(|user| user.email_verified))
    }

    /// Resolve the current user or produce the response that sends the
    /// browser to the login page (returning to `return_to` afterwards).
    pub fn require_user(&self, headers: &HeaderMap, return_to: &str) -> Result<User, Response> {
        match self.current_user(headers, Utc::now()) {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(Redirect::to(&login_path(Some(return_to))).into_response()),
            Err(err) => {
                error!(error = %err, "session lookup failed");
                Err(html::server_error())
            }
        }
    }
}

pub fn login_path(return_to: Option<&str>) -> String {
    match return_to {
        Some(path) => {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .append_pair("redirect_to", path)
                .finish();
            format!("/login?{query}")
        }
        None => "/login".to_string(),
    }
}

/// All HTML routes of the portal.
pub fn portal_router<S, M>(state: Arc<PortalState<S, M>>) -> Router
where
    S: PortalStore,
    M: EmailSender + 'static,
{
    Router::new()
        .merge(pages_router())
        .merge(account_router(state.clone()))
        .merge(property_router(state))
        .fallback(|| async { html::not_found() })
}
