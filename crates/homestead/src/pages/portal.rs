use axum::http::StatusCode;
use axum::response::Response;

use crate::html::page;

/// The tenant portal is not open yet; the route exists so links resolve.
pub async fn portal() -> Response {
    page(
        StatusCode::SERVICE_UNAVAILABLE,
        "Tenant portal",
        "<h1>Tenant portal</h1>\n\
         <p>The tenant portal isn't available yet. Tenants will be able to pay rent, \
         submit maintenance requests, and review their lease here.</p>\n\
         <p>In the meantime, please contact your property manager directly.</p>",
    )
}
