use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{error, warn};

use super::change_email::{ChangeEmailError, ChangeEmailForm};
use super::login::{safe_redirect, LoginError, LoginForm};
use super::mailer::EmailSender;
use super::session::{SessionData, VerificationSession, SESSION_COOKIE, VERIFICATION_COOKIE};
use super::verification::VerificationKind;
use super::views::{self, VerifyView};
use crate::forms::FormErrors;
use crate::html;
use crate::web::{PortalState, PortalStore};

pub const CHANGE_EMAIL_PATH: &str = "/settings/profile/change-email";
pub const PROFILE_PATH: &str = "/settings/profile";
const DEFAULT_LANDING: &str = "/organizations";

/// Router exposing login, verification, and profile settings pages.
pub fn account_router<S, M>(state: Arc<PortalState<S, M>>) -> Router
where
    S: PortalStore,
    M: EmailSender + 'static,
{
    Router::new()
        .route("/login", get(login_page).post(login_handler::<S, M>))
        .route("/logout", post(logout_handler::<S, M>))
        .route(
            "/verify",
            get(verify_page::<S, M>).post(verify_handler::<S, M>),
        )
        .route(PROFILE_PATH, get(profile_page::<S, M>))
        .route(
            CHANGE_EMAIL_PATH,
            get(change_email_page::<S, M>).post(change_email_handler::<S, M>),
        )
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LoginQuery {
    #[serde(default)]
    redirect_to: Option<String>,
}

pub(crate) async fn login_page(Query(query): Query<LoginQuery>) -> Response {
    let redirect_to = query.redirect_to.as_deref().and_then(safe_redirect);
    views::login(StatusCode::OK, "", redirect_to, &FormErrors::new())
}

pub(crate) async fn login_handler<S, M>(
    State(state): State<Arc<PortalState<S, M>>>,
    Form(form): Form<LoginForm>,
) -> Response
where
    S: PortalStore,
    M: EmailSender + 'static,
{
    let redirect_to = form.redirect_to.as_deref().and_then(safe_redirect);
    match state.login.request(&form, Utc::now()).await {
        Ok(requested) => Redirect::to(&requested.redirect_to).into_response(),
        Err(LoginError::Validation(errors)) => {
            views::login(StatusCode::BAD_REQUEST, &form.email, redirect_to, &errors)
        }
        Err(LoginError::Mail(err)) => views::login(
            StatusCode::INTERNAL_SERVER_ERROR,
            &form.email,
            redirect_to,
            &FormErrors::form(err.to_string()),
        ),
        Err(LoginError::Repository(err)) => {
            error!(error = %err, "login request failed");
            html::server_error()
        }
    }
}

pub(crate) async fn logout_handler<S, M>(State(state): State<Arc<PortalState<S, M>>>) -> Response
where
    S: PortalStore,
    M: EmailSender + 'static,
{
    match state.sessions.clear_cookie(SESSION_COOKIE) {
        Ok(cookie) => (AppendHeaders([(SET_COOKIE, cookie)]), Redirect::to("/")).into_response(),
        Err(err) => {
            error!(error = %err, "unable to clear session cookie");
            html::server_error()
        }
    }
}

/// Fields shared by the `/verify` query string and form body.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct VerifyForm {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    target: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    redirect_to: Option<String>,
}

impl VerifyForm {
    fn view(&self) -> VerifyView<'_> {
        VerifyView {
            kind: &self.kind,
            target: &self.target,
            code: self.code.as_deref().unwrap_or_default(),
            redirect_to: self.redirect_to.as_deref().and_then(safe_redirect),
        }
    }
}

/// Render the code form, or verify straight away when the emailed link
/// already carries the code.
pub(crate) async fn verify_page<S, M>(
    State(state): State<Arc<PortalState<S, M>>>,
    headers: HeaderMap,
    Query(query): Query<VerifyForm>,
) -> Response
where
    S: PortalStore,
    M: EmailSender + 'static,
{
    if query.code.as_deref().is_some_and(|code| !code.is_empty()) {
        return process_verification(&state, &headers, query).await;
    }
    views::verify(StatusCode::OK, &query.view(), &FormErrors::new())
}

pub(crate) async fn verify_handler<S, M>(
    State(state): State<Arc<PortalState<S, M>>>,
    headers: HeaderMap,
    Form(form): Form<VerifyForm>,
) -> Response
where
    S: PortalStore,
    M: EmailSender + 'static,
{
    process_verification(&state, &headers, form).await
}

async fn process_verification<S, M>(
    state: &PortalState<S, M>,
    headers: &HeaderMap,
    form: VerifyForm,
) -> Response
where
    S: PortalStore,
    M: EmailSender + 'static,
{
    let code = form.code.clone().unwrap_or_default();
    let now = Utc::now();

    match VerificationKind::parse(&form.kind) {
        Some(VerificationKind::Login) => match state.login.confirm(&form.target, &code, now) {
            Ok(user) => {
                let session = SessionData::new(user.id.clone(), now);
                let cookie = match state.sessions.session_cookie(&session, now) {
                    Ok(cookie) => cookie,
                    Err(err) => {
                        error!(error = %err, "unable to issue session cookie");
                        return html::server_error();
                    }
                };
                let destination = form
                    .redirect_to
                    .as_deref()
                    .and_then(safe_redirect)
                    .unwrap_or(DEFAULT_LANDING);
                (
                    AppendHeaders([(SET_COOKIE, cookie)]),
                    Redirect::to(destination),
                )
                    .into_response()
            }
            Err(LoginError::Validation(errors)) => {
                views::verify(StatusCode::BAD_REQUEST, &form.view(), &errors)
            }
            Err(err) => {
                error!(error = %err, "login verification failed");
                html::server_error()
            }
        },
        Some(VerificationKind::ChangeEmail) => {
            let return_to = verify_return_path(&form);
            let user = match state.require_user(headers, &return_to) {
                Ok(user) => user,
                Err(response) => return response,
            };
            if user.id.0 != form.target {
                warn!(user_id = %user.id, "change-email code submitted for another account");
                let errors = FormErrors::field("code", "Invalid code");
                return views::verify(StatusCode::BAD_REQUEST, &form.view(), &errors);
            }

            let pending = state
                .sessions
                .read_verification(headers, now)
                .map(|session| session.new_email);
            match state.change_email.confirm(&user, pending, &code, now).await {
                Ok(_) => match state.sessions.clear_cookie(VERIFICATION_COOKIE) {
                    Ok(cookie) => (
                        AppendHeaders([(SET_COOKIE, cookie)]),
                        Redirect::to(PROFILE_PATH),
                    )
                        .into_response(),
                    Err(err) => {
                        error!(error = %err, "unable to clear verification cookie");
                        html::server_error()
                    }
                },
                Err(ChangeEmailError::Validation(errors)) => {
                    views::verify(StatusCode::BAD_REQUEST, &form.view(), &errors)
                }
                Err(err) => {
                    error!(error = %err, "email change confirmation failed");
                    html::server_error()
                }
            }
        }
        None => views::verify(
            StatusCode::BAD_REQUEST,
            &form.view(),
            &FormErrors::form("Unknown verification type"),
        ),
    }
}

/// The `/verify` form location to come back to after logging in.
fn verify_return_path(form: &VerifyForm) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("type", &form.kind)
        .append_pair("target", &form.target)
        .finish();
    format!("/verify?{query}")
}

pub(crate) async fn profile_page<S, M>(
    State(state): State<Arc<PortalState<S, M>>>,
    headers: HeaderMap,
) -> Response
where
    S: PortalStore,
    M: EmailSender + 'static,
{
    match state.require_user(&headers, PROFILE_PATH) {
        Ok(user) => views::profile(&user),
        Err(response) => response,
    }
}

pub(crate) async fn change_email_page<S, M>(
    State(state): State<Arc<PortalState<S, M>>>,
    headers: HeaderMap,
) -> Response
where
    S: PortalStore,
    M: EmailSender + 'static,
{
    match state.require_user(&headers, CHANGE_EMAIL_PATH) {
        Ok(user) => views::change_email(StatusCode::OK, &user, "", &FormErrors::new()),
        Err(response) => response,
    }
}

/// Authenticate, validate, issue and send the code, remember the pending
/// address on this device, then redirect to the code form. Only a delivered
/// code redirects.
pub(crate) async fn change_email_handler<S, M>(
    State(state): State<Arc<PortalState<S, M>>>,
    headers: HeaderMap,
    Form(form): Form<ChangeEmailForm>,
) -> Response
where
    S: PortalStore,
    M: EmailSender + 'static,
{
    let user = match state.require_user(&headers, CHANGE_EMAIL_PATH) {
        Ok(user) => user,
        Err(response) => return response,
    };

    let now = Utc::now();
    match state.change_email.request(&user, &form, now).await {
        Ok(requested) => {
            let pending = VerificationSession {
                new_email: requested.new_email,
                expires_at: requested.expires_at,
            };
            match state.sessions.verification_cookie(&pending, now) {
                Ok(cookie) => (
                    AppendHeaders([(SET_COOKIE, cookie)]),
                    Redirect::to(&requested.redirect_to),
                )
                    .into_response(),
                Err(err) => {
                    error!(error = %err, "unable to issue verification cookie");
                    html::server_error()
                }
            }
        }
        Err(ChangeEmailError::Validation(errors)) => {
            views::change_email(StatusCode::BAD_REQUEST, &user, &form.email, &errors)
        }
        Err(ChangeEmailError::Mail(err)) => views::change_email(
            StatusCode::INTERNAL_SERVER_ERROR,
            &user,
            &form.email,
            &FormErrors::form(err.to_string()),
        ),
        Err(ChangeEmailError::Repository(err)) => {
            error!(error = %err, "email change request failed");
            html::server_error()
        }
    }
}
