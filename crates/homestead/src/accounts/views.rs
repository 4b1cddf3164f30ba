use axum::http::StatusCode;
use axum::response::Response;

use super::domain::User;
use crate::forms::FormErrors;
use crate::html::{error_list, escape, hidden_field, input_field, page};

pub(super) fn login(
    status: StatusCode,
    email: &str,
    redirect_to: Option<&str>,
    errors: &FormErrors,
) -> Response {
    let redirect = redirect_to
        .map(|path| hidden_field("redirect_to", path))
        .unwrap_or_default();
    let body = format!(
        "<h1>Log in</h1>\n<p>We'll email you a one-time code.</p>\n\
         <form method=\"post\" action=\"/login\">\n{redirect}\n{email}\n{form_errors}\n\
         <button type=\"submit\">Send code</button>\n</form>",
        email = input_field("Email", "email", "email", email, errors.for_field("email")),
        form_errors = error_list("login-form-errors", errors.form_errors()),
    );
    page(status, "Log in", &body)
}

pub(super) struct VerifyView<'a> {
    pub kind: &'a str,
    pub target: &'a str,
    pub code: &'a str,
    pub redirect_to: Option<&'a str>,
}

pub(super) fn verify(status: StatusCode, view: &VerifyView<'_>, errors: &FormErrors) -> Response {
    let heading = match view.kind {
        "change-email" => "Confirm your new email",
        _ => "Check your email",
    };
    let redirect = view
        .redirect_to
        .map(|path| hidden_field("redirect_to", path))
        .unwrap_or_default();
    let body = format!(
        "<h1>{heading}</h1>\n<p>We've sent you a code to verify your email address.</p>\n\
         <form method=\"post\" action=\"/verify\">\n{kind}\n{target}\n{redirect}\n{code}\n{form_errors}\n\
         <button type=\"submit\">Submit</button>\n</form>",
        kind = hidden_field("type", view.kind),
        target = hidden_field("target", view.target),
        code = input_field("Code", "code", "text", view.code, errors.for_field("code")),
        form_errors = error_list("verify-form-errors", errors.form_errors()),
    );
    page(status, heading, &body)
}

pub(super) fn profile(user: &User) -> Response {
    let body = format!(
        "<h1>Profile</h1>\n<p>Signed in as {name}</p>\n<p>Email: <span id=\"current-email\">{email}</span></p>\n\
         <p><a href=\"/settings/profile/change-email\">Change email</a></p>\n\
         <form method=\"post\" action=\"/logout\"><button type=\"submit\">Log out</button></form>",
        name = escape(user.display_name()),
        email = escape(user.email.as_str()),
    );
    page(StatusCode::OK, "Profile", &body)
}

pub(super) fn change_email(
    status: StatusCode,
    user: &User,
    email: &str,
    errors: &FormErrors,
) -> Response {
    let body = format!(
        "<h1>Change email</h1>\n\
         <p>You will receive an email at the new address to confirm.</p>\n\
         <p>An email notice will also be sent to your old address {current}.</p>\n\
         <form method=\"post\" action=\"/settings/profile/change-email\">\n{field}\n{form_errors}\n\
         <button type=\"submit\">Send confirmation</button>\n</form>",
        current = escape(user.email.as_str()),
        field = input_field("New email", "email", "email", email, errors.for_field("email")),
        form_errors = error_list("change-email-form-errors", errors.form_errors()),
    );
    page(status, "Change email", &body)
}
