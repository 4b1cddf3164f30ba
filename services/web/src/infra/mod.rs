mod db;
mod mail;

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub use db::Database;
pub use mail::{HttpMailer, LogMailer, Mailer};

/// Operational state shared with the health, readiness, and metrics routes.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}
