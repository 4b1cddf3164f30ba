//! Minimal server-side HTML rendering shared by every page.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

pub const SITE_NAME: &str = "Homestead";

/// Escape text for use in element content and quoted attribute values.
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Wrap page content in the site chrome.
pub fn layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title} | {site}</title>\n</head>\n<body>\n<header>\n<nav>\n\
         <a href=\"/\">{site}</a>\n<a href=\"/about\">About</a>\n\
         <a href=\"/organizations\">Organizations</a>\n<a href=\"/portal\">Tenant portal</a>\n\
         <a href=\"/settings/profile\">Account</a>\n</nav>\n</header>\n\
         <main>\n{body}\n</main>\n<footer>\n<a href=\"/privacy\">Privacy</a>\n\
         <a href=\"/terms\">Terms</a>\n</footer>\n</body>\n</html>\n",
        title = escape(title),
        site = SITE_NAME,
    ))
}

pub fn page(status: StatusCode, title: &str, body: &str) -> Response {
    (status, layout(title, body)).into_response()
}

/// Render an error list; empty input renders nothing.
pub fn error_list(id: &str, errors: &[String]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let items: String = errors
        .iter()
        .map(|error| format!("<li>{}</li>", escape(error)))
        .collect();
    format!(
        "<ul id=\"{}\" class=\"errors\" role=\"alert\">{items}</ul>",
        escape(id)
    )
}

/// Labelled input with its error list.
pub fn input_field(label: &str, name: &str, kind: &str, value: &str, errors: &[String]) -> String {
    let invalid = if errors.is_empty() {
        ""
    } else {
        " aria-invalid=\"true\""
    };
    format!(
        "<div class=\"field\">\n<label for=\"{name}\">{label}</label>\n\
         <input id=\"{name}\" name=\"{name}\" type=\"{kind}\" value=\"{value}\"{invalid}>\n{errors}\n</div>",
        name = escape(name),
        label = escape(label),
        kind = escape(kind),
        value = escape(value),
        errors = error_list(&format!("{name}-errors"), errors),
    )
}

pub fn hidden_field(name: &str, value: &str) -> String {
    format!(
        "<input type=\"hidden\" name=\"{}\" value=\"{}\">",
        escape(name),
        escape(value)
    )
}

pub fn server_error() -> Response {
    page(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Something went wrong",
        "<h1>Something went wrong</h1>\n<p>Please try again in a moment.</p>",
    )
}

pub fn not_found() -> Response {
    page(
        StatusCode::NOT_FOUND,
        "Not found",
        "<h1>Not found</h1>\n<p>We couldn't find what you were looking for.</p>",
    )
}
