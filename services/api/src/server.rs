use crate::cli::ServeArgs;
use crate::infra::{document_gate, open_store, AppState};
use crate::routes::with_lookup_routes;
use agent_map::config::AppConfig;
use agent_map::error::AppError;
use agent_map::licensing::LookupService;
use agent_map::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

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
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = open_store(&config, args.store().database)?;
    let lookup_service = Arc::new(LookupService::new(
        store.clone(),
        store,
        document_gate(&config),
    ));

    let app = with_lookup_routes(lookup_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        document_root = %config.storage.document_root.display(),
        "agent map service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
