use crate::cli::ServeArgs;
use crate::infra::{AppState, Database, Mailer};
use crate::routes::with_portal_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use homestead::config::AppConfig;
use homestead::error::AppError;
use homestead::telemetry;
use homestead::web::PortalState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let database = Arc::new(Database::open(&config.database.path)?);
    let mailer = Arc::new(Mailer::from_config(&config.mail));
    if matches!(mailer.as_ref(), Mailer::Log(_)) {
        warn!("MAIL_API_KEY not set; outgoing email will only be logged");
    }
    let portal = Arc::new(PortalState::new(database, mailer, &config.accounts));

    let app = with_portal_routes(portal)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        database = %config.database.path,
        "homestead portal ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
