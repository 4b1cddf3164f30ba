//! Public pages: marketing content and the tenant portal placeholder.

mod marketing;
mod portal;

use axum::routing::get;
use axum::Router;

pub use marketing::{about, home, privacy, terms};
pub use portal::portal;

/// Stateless routes; merged into the portal router.
pub fn pages_router() -> Router {
    Router::new()
        .route("/", get(home))
        .route("/about", get(about))
        .route("/privacy", get(privacy))
        .route("/terms", get(terms))
        .route("/portal", get(portal))
}
