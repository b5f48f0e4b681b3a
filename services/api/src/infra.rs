use agent_map::config::AppConfig;
use agent_map::error::AppError;
use agent_map::licensing::{DocumentGate, SqliteStore};
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Opens the configured database (or `database` when given) and applies the schema.
pub(crate) fn open_store(
    config: &AppConfig,
    database: Option<PathBuf>,
) -> Result<Arc<SqliteStore>, AppError> {
    let path = database.unwrap_or_else(|| config.storage.database_path.clone());
    let store = SqliteStore::open(&path)?;
    store.migrate()?;
    tracing::debug!(path = %path.display(), "license store opened");
    Ok(Arc::new(store))
}

pub(crate) fn document_gate(config: &AppConfig) -> DocumentGate {
    DocumentGate::new(
        config.storage.document_root.clone(),
        config.storage.document_marker.clone(),
    )
}
