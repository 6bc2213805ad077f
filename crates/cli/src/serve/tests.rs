//! In-process tests for the HTTP API, driven through `tower::ServiceExt`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use repairdesk_core::ServiceDesk;
use repairdesk_storage::{
    MemoryStore, NewServiceRow, RecordStore, ServicePatch, ServiceRow, StorageError,
};
use serde_json::{json, Value};
use tokio::sync::{Notify, Semaphore};
use tower::ServiceExt;

use super::state::AppState;
use super::app;
use crate::link::LinkMonitor;

const SECRET: &str = "s3cret";

fn row(id: i64, customer: &str, status: &str, item: &str) -> ServiceRow {
    ServiceRow {
        id,
        created_at: format!("2024-05-{:02}T10:00:00Z", id),
        customer_name: Some(customer.to_string()),
        customer_phone: None,
        deadline: None,
        high_priority: Some(false),
        status: status.to_string(),
        item_name: Some(vec![item.to_string()].into()),
        item_damage: Some(vec![String::new()].into()),
        item_notes: Some(vec![String::new()].into()),
    }
}

fn state_with(rows: Vec<ServiceRow>, secret: Option<&str>) -> Arc<AppState> {
    let desk = ServiceDesk::new(Arc::new(MemoryStore::with_rows(rows)));
    let secret = secret.map(str::to_string).filter(|s| !s.is_empty());
    Arc::new(AppState::new(desk, secret, LinkMonitor::start(None)))
}

fn router_with(rows: Vec<ServiceRow>, secret: Option<&str>) -> axum::Router {
    app(state_with(rows, secret))
}

fn router(rows: Vec<ServiceRow>) -> axum::Router {
    router_with(rows, Some(SECRET))
}

async fn api(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    send(router, method, uri, body, Some(SECRET)).await
}

async fn send(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    bearer: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    let body = match body {
        Some(v) => Body::from(serde_json::to_string(&v).unwrap()),
        None => Body::empty(),
    };
    let req = builder.body(body).unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        json!(null)
    } else {
        serde_json::from_slice(&bytes).unwrap_or(json!(null))
    };
    (status, json)
}

fn ids(body: &Value) -> Vec<i64> {
    body["services"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_i64().unwrap())
        .collect()
}

// ── Auth ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_needs_no_auth() {
    let r = router(vec![]);
    let (status, body) = send(&r, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn services_require_secret() {
    let r = router(vec![]);
    let (status, _) = send(&r, "GET", "/services", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&r, "GET", "/services", None, Some("wrong")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn x_api_key_is_accepted() {
    let r = router(vec![]);
    let req = Request::builder()
        .uri("/services")
        .header("x-api-key", SECRET)
        .body(Body::empty())
        .unwrap();
    let resp = r.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_checks_secret() {
    let r = router(vec![]);
    let (status, body) = send(&r, "POST", "/login", Some(json!({"secret": SECRET})), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authenticated"], true);
    let (status, _) = send(&r, "POST", "/login", Some(json!({"secret": "nope"})), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn no_secret_configured_is_unavailable() {
    let r = router_with(vec![], Some(""));
    let (status, body) = send(&r, "POST", "/login", Some(json!({"secret": ""})), None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("REPAIRDESK_SHARED_SECRET"));
    let (status, _) = send(&r, "GET", "/services", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

// ── Listing ──────────────────────────────────────────────────────────────────

fn fixture() -> Vec<ServiceRow> {
    vec![
        row(1, "Fajar", "Inspection", "Monitor"),
        row(2, "Eko", "PickedUp", "Tablet"),
        row(3, "Sari", "Done", "Mouse"),
        row(4, "Budi", "Intake", "Laptop"),
    ]
}

#[tokio::test]
async fn list_defaults_to_active_tab_newest_first() {
    let r = router(fixture());
    let (status, body) = api(&r, "GET", "/services", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tab"], "active");
    assert_eq!(ids(&body), vec![4, 1]);
    assert_eq!(body["counts"]["active"], 2);
    assert_eq!(body["counts"]["history"], 2);
}

#[tokio::test]
async fn list_filters_by_search_status_and_tab() {
    let r = router(fixture());
    let (_, body) = api(&r, "GET", "/services?tab=history&search=mouse", None).await;
    assert_eq!(ids(&body), vec![3]);
    let (_, body) = api(&r, "GET", "/services?tab=history&status=PickedUp", None).await;
    assert_eq!(ids(&body), vec![2]);
    let (status, _) = api(&r, "GET", "/services?status=Lost", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Writes ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_inserts_intake_record() {
    let r = router(vec![]);
    let payload = json!({
        "customer_name": "Budi",
        "items": [{"name": "Laptop"}],
    });
    let (status, body) = api(&r, "POST", "/services", Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["service"]["status"], "Intake");
    assert_eq!(body["service"]["items"][0]["name"], "Laptop");
    assert_eq!(body["service"]["items"][0]["damage"], "");
    assert_eq!(body["service"]["high_priority"], false);
    assert_eq!(body["service"]["deadline"], Value::Null);
}

#[tokio::test]
async fn create_rejects_invalid_draft() {
    let r = router(vec![]);
    let (status, body) = api(
        &r,
        "POST",
        "/services",
        Some(json!({"customer_name": "Budi", "items": [{"name": "Laptop"}, {"name": " "}]})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "item 2 needs a name");

    let (status, _) = api(
        &r,
        "POST",
        "/services",
        Some(json!({"customer_name": "Budi", "deadline": "soon", "items": [{"name": "Laptop"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_rewrites_fields_not_status() {
    let r = router(fixture());
    let payload = json!({
        "customer_name": "Sari W.",
        "customer_phone": "0812",
        "deadline": "2030-01-15",
        "high_priority": true,
        "items": [{"name": "Mouse", "damage": "Scroll broken"}, {"name": "Pad"}],
    });
    let (status, body) = api(&r, "PUT", "/services/3", Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    let svc = &body["service"];
    assert_eq!(svc["customer_name"], "Sari W.");
    assert_eq!(svc["deadline"], "2030-01-15");
    assert_eq!(svc["status"], "Done");
    assert_eq!(svc["items"][1]["name"], "Pad");
    assert_eq!(svc["urgency"], "normal");

    let (status, _) = api(&r, "PUT", "/services/99", Some(json!({"customer_name": "X", "items": [{"name": "Y"}]}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_change_needs_confirmation() {
    let r = router(fixture());
    let (status, body) = api(
        &r,
        "POST",
        "/services/4/status",
        Some(json!({"status": "Inspection"})),
    )
    .await;
    assert_eq!(status, StatusCode::PRECONDITION_REQUIRED);
    assert_eq!(
        body["prompt"],
        "Change status from \"Intake\" to \"Inspection\"?"
    );

    let (status, body) = api(
        &r,
        "POST",
        "/services/4/status",
        Some(json!({"status": "Inspection", "confirmed": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["from"], "Intake");
    assert_eq!(body["status"], "Inspection");
    assert_eq!(body["changed"], true);
}

#[tokio::test]
async fn status_regression_is_conflict() {
    let r = router(fixture());
    let (status, body) = api(
        &r,
        "POST",
        "/services/3/status",
        Some(json!({"status": "Intake", "confirmed": true})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("backwards"));

    let (_, body) = api(&r, "GET", "/services?tab=history", None).await;
    let done = body["services"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["id"] == 3)
        .unwrap();
    assert_eq!(done["status"], "Done");
}

#[tokio::test]
async fn same_status_is_unchanged() {
    let r = router(fixture());
    let (status, body) = api(
        &r,
        "POST",
        "/services/2/status",
        Some(json!({"status": "PickedUp"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], false);
}

#[tokio::test]
async fn delete_requires_confirmed_flag() {
    let r = router(fixture());
    let (status, _) = api(&r, "DELETE", "/services/1", None).await;
    assert_eq!(status, StatusCode::PRECONDITION_REQUIRED);
    let (status, body) = api(&r, "DELETE", "/services/1?confirmed=true", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 1);
    let (status, _) = api(&r, "DELETE", "/services/1?confirmed=true", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn link_reports_unconfigured() {
    let r = router(vec![]);
    let (status, body) = api(&r, "GET", "/link", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["configured"], false);
    assert_eq!(body["viewer"]["state"]["state"], "info_message");
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let r = router(vec![]);
    let (status, body) = api(&r, "GET", "/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not found");
}

#[tokio::test]
async fn write_while_busy_is_refused() {
    let state = state_with(fixture(), Some(SECRET));
    let r = app(state.clone());
    let _held = state.writes.lock().await;
    let (status, body) = api(
        &r,
        "POST",
        "/services/4/status",
        Some(json!({"status": "Inspection", "confirmed": true})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("in progress"));
}

/// A store whose listing waits until the test releases it.
struct SlowListStore {
    inner: MemoryStore,
    listing: Notify,
    release: Semaphore,
}

#[async_trait]
impl RecordStore for SlowListStore {
    async fn list_services(&self) -> Result<Vec<ServiceRow>, StorageError> {
        self.listing.notify_one();
        let _permit = self
            .release
            .acquire()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        self.inner.list_services().await
    }

    async fn insert_service(&self, row: NewServiceRow) -> Result<ServiceRow, StorageError> {
        self.inner.insert_service(row).await
    }

    async fn update_service(&self, id: i64, patch: ServicePatch) -> Result<(), StorageError> {
        self.inner.update_service(id, patch).await
    }

    async fn delete_service(&self, id: i64) -> Result<(), StorageError> {
        self.inner.delete_service(id).await
    }
}

#[tokio::test]
async fn write_during_slow_list_waits_instead_of_conflicting() {
    let store = Arc::new(SlowListStore {
        inner: MemoryStore::new(),
        listing: Notify::new(),
        release: Semaphore::new(0),
    });
    let shared: Arc<dyn RecordStore> = store.clone();
    let desk = ServiceDesk::new(shared);
    let state = Arc::new(AppState::new(
        desk,
        Some(SECRET.to_string()),
        LinkMonitor::start(None),
    ));
    let r = app(state);

    let reader = tokio::spawn({
        let r = r.clone();
        async move { api(&r, "GET", "/services", None).await }
    });
    store.listing.notified().await;

    let writer = tokio::spawn({
        let r = r.clone();
        async move {
            let payload = json!({"customer_name": "Budi", "items": [{"name": "Laptop"}]});
            api(&r, "POST", "/services", Some(payload)).await
        }
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    store.release.add_permits(1);

    let (status, _) = reader.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let (status, body) = writer.await.unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["service"]["customer_name"], "Budi");
}
