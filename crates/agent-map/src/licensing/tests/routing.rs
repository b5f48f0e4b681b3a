use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use std::sync::Arc;
use tower::ServiceExt;

use crate::licensing::expiration::NO_LICENSE_DAYS;
use crate::licensing::repository::StoreError;
use crate::licensing::router::{licensing_router, run_blocking, view_form_handler};
use crate::licensing::service::LookupError;
use axum::response::IntoResponse;

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request builds")
}

#[tokio::test]
async fn companies_route_returns_view_model() {
    let dir = tempfile::tempdir().expect("temp dir");
    let router = licensing_router(Arc::new(service_over(populated_store(), dir.path())));

    let response = router
        .oneshot(get("/api/v1/agents/agent-7/states/TX/companies"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["state_name"], "Texas");
    assert_eq!(payload["state_code"], "TX");
    assert_eq!(payload["forms"].as_array().map(Vec::len), Some(3));
    assert_eq!(payload["days_until_expiration"], NO_LICENSE_DAYS);
    assert_eq!(payload["is_expiring_soon"], false);
    assert!(payload["license_number"].is_null());
    assert!(payload["portal_urls"]["Ace Chubb"].is_string());
}

#[tokio::test]
async fn companies_route_maps_unknown_state_to_not_found() {
    let dir = tempfile::tempdir().expect("temp dir");
    let router = licensing_router(Arc::new(service_over(populated_store(), dir.path())));

    let response = router
        .oneshot(get("/api/v1/agents/agent-7/states/ZZ/companies"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "unknown state code 'ZZ'");
}

#[tokio::test]
async fn storage_outage_maps_to_service_unavailable() {
    let dir = tempfile::tempdir().expect("temp dir");
    let router = licensing_router(Arc::new(service_over(UnavailableStore, dir.path())));

    let response = router
        .oneshot(get("/api/v1/agents/agent-7/licenses"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn licenses_route_lists_agent_map() {
    let dir = tempfile::tempdir().expect("temp dir");
    let router = licensing_router(Arc::new(service_over(populated_store(), dir.path())));

    let response = router
        .oneshot(get("/api/v1/agents/agent-7/licenses"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let licenses = payload.as_array().expect("array payload");
    assert_eq!(licenses.len(), 1);
    assert_eq!(licenses[0]["state"], "IA");
    assert_eq!(licenses[0]["color"], "#0692e1");
    assert_eq!(licenses[0]["expiration"], "2025-09-30");
}

#[tokio::test]
async fn form_route_streams_pdf_inline() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_document(dir.path(), "MOO_TX_OC.pdf", b"%PDF-1.4 moo");
    let router = licensing_router(Arc::new(service_over(populated_store(), dir.path())));

    let response = router
        .oneshot(get("/api/v1/forms/1"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "inline; filename=\"MOO_TX_OC.pdf\""
    );
    let body = axum::body::to_bytes(response.into_body(), 1024)
        .await
        .expect("read body");
    assert_eq!(&body[..], b"%PDF-1.4 moo");
}

#[tokio::test]
async fn form_handler_rejects_traversal_with_bad_request() {
    let dir = tempfile::tempdir().expect("temp dir");
    let service = Arc::new(service_over(populated_store(), dir.path()));

    let response = view_form_handler(State(service), Path(4)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn form_route_maps_missing_forms_and_files_to_not_found() {
    let dir = tempfile::tempdir().expect("temp dir");
    let router = licensing_router(Arc::new(service_over(populated_store(), dir.path())));

    let missing_form = router
        .clone()
        .oneshot(get("/api/v1/forms/42"))
        .await
        .expect("route executes");
    assert_eq!(missing_form.status(), StatusCode::NOT_FOUND);

    let missing_file = router
        .oneshot(get("/api/v1/forms/3"))
        .await
        .expect("route executes");
    assert_eq!(missing_file.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn panicking_lookup_becomes_internal_error() {
    let outcome: Result<(), LookupError> = run_blocking(|| panic!("store driver crashed")).await;

    let err = outcome.expect_err("panic surfaces as an error");
    assert!(matches!(err, LookupError::Interrupted(_)));
    assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn only_unavailable_storage_maps_to_service_unavailable() {
    let cases = [
        (StoreError::Unavailable("busy".to_string()), StatusCode::SERVICE_UNAVAILABLE),
        (StoreError::Corrupt("bad date".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        (StoreError::Rejected("unique".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
    ];

    for (store_error, expected) in cases {
        let response = LookupError::Storage(store_error).into_response();
        assert_eq!(response.status(), expected);
    }
}
