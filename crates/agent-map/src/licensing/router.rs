use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Local;
use serde_json::json;

use super::domain::{AgentId, FormId};
use super::repository::{FormRepository, LicenseRepository};
use super::service::{LookupError, LookupService};

/// Router builder exposing the license map, state lookup, and form download.
pub fn licensing_router<L, F>(service: Arc<LookupService<L, F>>) -> Router
where
    L: LicenseRepository + 'static,
    F: FormRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/agents/:agent_id/licenses",
            get(licenses_handler::<L, F>),
        )
        .route(
            "/api/v1/agents/:agent_id/states/:state_code/companies",
            get(companies_handler::<L, F>),
        )
        .route("/api/v1/forms/:form_id", get(view_form_handler::<L, F>))
        .with_state(service)
}

pub(crate) async fn licenses_handler<L, F>(
    State(service): State<Arc<LookupService<L, F>>>,
    Path(agent_id): Path<String>,
) -> Response
where
    L: LicenseRepository + 'static,
    F: FormRepository + 'static,
{
    let lookup = run_blocking(move || service.licensed_states(&AgentId(agent_id)));
    match lookup.await {
        Ok(licenses) => (StatusCode::OK, axum::Json(licenses)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn companies_handler<L, F>(
    State(service): State<Arc<LookupService<L, F>>>,
    Path((agent_id, state_code)): Path<(String, String)>,
) -> Response
where
    L: LicenseRepository + 'static,
    F: FormRepository + 'static,
{
    let today = Local::now().date_naive();
    let lookup =
        run_blocking(move || service.companies_in_state(&AgentId(agent_id), &state_code, today));
    match lookup.await {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn view_form_handler<L, F>(
    State(service): State<Arc<LookupService<L, F>>>,
    Path(form_id): Path<i64>,
) -> Response
where
    L: LicenseRepository + 'static,
    F: FormRepository + 'static,
{
    match run_blocking(move || service.view_form(FormId(form_id))).await {
        Ok(document) => {
            let disposition = format!(
                "inline; filename=\"{}\"",
                document.file_name.replace('"', "")
            );
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, document.media_type.to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                document.bytes,
            )
                .into_response()
        }
        Err(err) => err.into_response(),
    }
}

/// Store queries and document reads block, so they run off the async workers.
pub(crate) async fn run_blocking<T, Op>(op: Op) -> Result<T, LookupError>
where
    Op: FnOnce() -> Result<T, LookupError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .unwrap_or_else(|join| Err(LookupError::Interrupted(join.to_string())))
}

impl IntoResponse for LookupError {
    fn into_response(self) -> Response {
        let status = match &self {
            err if err.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
            LookupError::UnknownState(_)
            | LookupError::FormNotFound(_)
            | LookupError::AgentNotFound(_) => StatusCode::NOT_FOUND,
            LookupError::PathTraversalRejected(_) => StatusCode::BAD_REQUEST,
            LookupError::DocumentUnavailable { source, .. }
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                StatusCode::NOT_FOUND
            }
            LookupError::Storage(_)
            | LookupError::DocumentUnavailable { .. }
            | LookupError::Interrupted(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "lookup failed");
        }

        let payload = json!({ "error": self.to_string() });
        (status, axum::Json(payload)).into_response()
    }
}
