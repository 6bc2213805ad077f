//! HTTP route handlers: health, login, services, status, link.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use repairdesk_core::record::parse_date;
use repairdesk_core::{
    Always, Editor, LineItem, ServiceDesk, ServiceRecord, Status, StatusChange, StatusFilter, Tab,
};
use serde::Deserialize;
use tokio::sync::MutexGuard;

use super::state::AppState;
use super::{desk_error, gate_error, json_error};
use crate::view::{today, ServiceView};

/// The write token plus the desk, held for the length of one write.
struct DeskWrite<'a> {
    _token: MutexGuard<'a, ()>,
    desk: MutexGuard<'a, ServiceDesk>,
}

impl Deref for DeskWrite<'_> {
    type Target = ServiceDesk;

    fn deref(&self) -> &ServiceDesk {
        &self.desk
    }
}

impl DerefMut for DeskWrite<'_> {
    fn deref_mut(&mut self) -> &mut ServiceDesk {
        &mut self.desk
    }
}

/// Take the desk for a write, or refuse while another write is in flight.
///
/// Only the write token is tried; a read that holds the desk is waited for.
async fn desk_for_write(state: &AppState) -> Result<DeskWrite<'_>, Response> {
    let token = state.writes.try_lock().map_err(|_| {
        json_error(StatusCode::CONFLICT, "another change is in progress; try again").into_response()
    })?;
    let desk = state.desk.lock().await;
    Ok(DeskWrite {
        _token: token,
        desk,
    })
}

/// Refetch and look up `id`, so writes act on the stored record.
async fn load_record(desk: &mut ServiceDesk, id: i64) -> Result<ServiceRecord, Response> {
    desk.refresh().await.map_err(desk_error)?;
    desk.find(id).cloned().ok_or_else(|| {
        json_error(StatusCode::NOT_FOUND, &format!("service {} not found", id)).into_response()
    })
}

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(response))
}

#[derive(Deserialize)]
pub(crate) struct LoginRequest {
    secret: String,
}

/// POST /login
pub(crate) async fn handle_login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Response {
    match state.gate.verify(&req.secret) {
        Ok(()) => {
            tracing::info!("client logged in");
            (StatusCode::OK, Json(serde_json::json!({ "authenticated": true }))).into_response()
        }
        Err(e) => gate_error(e).into_response(),
    }
}

#[derive(Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    search: String,
    status: Option<String>,
    tab: Option<String>,
}

/// GET /services?search=&status=&tab=
pub(crate) async fn handle_list_services(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> Response {
    let filter = match q.status.as_deref().map(str::parse::<StatusFilter>) {
        None => StatusFilter::All,
        Some(Ok(f)) => f,
        Some(Err(e)) => return json_error(StatusCode::BAD_REQUEST, &e.to_string()).into_response(),
    };
    let tab = match q.tab.as_deref().map(str::parse::<Tab>) {
        None => Tab::Active,
        Some(Ok(t)) => t,
        Some(Err(e)) => return json_error(StatusCode::BAD_REQUEST, &e).into_response(),
    };

    let mut desk = state.desk.lock().await;
    if let Err(e) = desk.refresh().await {
        return desk_error(e);
    }
    let parts = desk.view(&q.search, filter);
    let today = today();
    let services: Vec<ServiceView> = parts
        .tab(tab)
        .iter()
        .map(|r| ServiceView::new(r, today))
        .collect();

    let response = serde_json::json!({
        "tab": tab,
        "counts": { "active": parts.active.len(), "history": parts.history.len() },
        "services": services,
    });
    (StatusCode::OK, Json(response)).into_response()
}

/// Editor payload for create and update.
#[derive(Deserialize)]
pub(crate) struct ServicePayload {
    customer_name: String,
    #[serde(default)]
    customer_phone: String,
    #[serde(default)]
    deadline: Option<String>,
    #[serde(default)]
    high_priority: bool,
    #[serde(default)]
    items: Vec<LineItem>,
}

impl ServicePayload {
    fn apply_to(self, editor: &mut Editor) -> Result<(), Response> {
        let deadline = match self.deadline.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_date(raw).map_err(|e| {
                json_error(
                    StatusCode::BAD_REQUEST,
                    &format!("invalid deadline '{}': {}", raw, e),
                )
                .into_response()
            })?),
        };
        editor.set_customer_name(&self.customer_name);
        editor.set_customer_phone(&self.customer_phone);
        editor.set_deadline(deadline);
        editor.set_high_priority(self.high_priority);
        editor.replace_items(self.items);
        Ok(())
    }
}

/// POST /services
pub(crate) async fn handle_create_service(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ServicePayload>,
) -> Response {
    let mut desk = match desk_for_write(&state).await {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let mut editor = Editor::new_record();
    if let Err(resp) = payload.apply_to(&mut editor) {
        return resp;
    }
    match desk.submit(&editor).await {
        Ok(id) => {
            let service = desk.find(id).map(|r| ServiceView::new(r, today()));
            (
                StatusCode::CREATED,
                Json(serde_json::json!({ "id": id, "service": service })),
            )
                .into_response()
        }
        Err(e) => desk_error(e),
    }
}

/// PUT /services/{id}
pub(crate) async fn handle_update_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<ServicePayload>,
) -> Response {
    let mut desk = match desk_for_write(&state).await {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let record = match load_record(&mut desk, id).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let mut editor = Editor::for_record(&record);
    if let Err(resp) = payload.apply_to(&mut editor) {
        return resp;
    }
    match desk.submit(&editor).await {
        Ok(id) => {
            let service = desk.find(id).map(|r| ServiceView::new(r, today()));
            (
                StatusCode::OK,
                Json(serde_json::json!({ "id": id, "service": service })),
            )
                .into_response()
        }
        Err(e) => desk_error(e),
    }
}

#[derive(Deserialize)]
pub(crate) struct StatusRequest {
    status: String,
    #[serde(default)]
    confirmed: bool,
}

/// POST /services/{id}/status
///
/// Allowed changes need `confirmed: true`; without it the response is 428
/// carrying the question to put to the operator.
pub(crate) async fn handle_change_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<StatusRequest>,
) -> Response {
    let requested: Status = match req.status.parse() {
        Ok(s) => s,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, &e.to_string()).into_response(),
    };
    let mut desk = match desk_for_write(&state).await {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    if let Err(resp) = load_record(&mut desk, id).await {
        return resp;
    }

    let mut prompt = None;
    let mut confirm = |p: &str| {
        prompt = Some(p.to_string());
        req.confirmed
    };
    let outcome = desk.change_status(id, requested, &mut confirm).await;
    match outcome {
        Ok(StatusChange::Unchanged) => (
            StatusCode::OK,
            Json(serde_json::json!({ "id": id, "status": requested, "changed": false })),
        )
            .into_response(),
        Ok(StatusChange::Applied { from, to }) => (
            StatusCode::OK,
            Json(serde_json::json!({ "id": id, "from": from, "status": to, "changed": true })),
        )
            .into_response(),
        Ok(StatusChange::Declined) => (
            StatusCode::PRECONDITION_REQUIRED,
            Json(serde_json::json!({
                "error": "confirmation required",
                "prompt": prompt,
            })),
        )
            .into_response(),
        Err(e) => desk_error(e),
    }
}

#[derive(Deserialize)]
pub(crate) struct DeleteQuery {
    #[serde(default)]
    confirmed: bool,
}

/// DELETE /services/{id}?confirmed=true
pub(crate) async fn handle_delete_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(q): Query<DeleteQuery>,
) -> Response {
    let mut desk = match desk_for_write(&state).await {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    if let Err(resp) = load_record(&mut desk, id).await {
        return resp;
    }
    match desk.delete(id, &mut Always(q.confirmed)).await {
        Ok(true) => (StatusCode::OK, Json(serde_json::json!({ "deleted": id }))).into_response(),
        Ok(false) => json_error(
            StatusCode::PRECONDITION_REQUIRED,
            "confirmation required; repeat with ?confirmed=true",
        )
        .into_response(),
        Err(e) => desk_error(e),
    }
}

/// GET /link
pub(crate) async fn handle_link(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let viewer = state.link.current();
    let response = serde_json::json!({
        "configured": state.link.is_connecting(),
        "status_line": viewer.status_line(),
        "viewer": viewer,
    });
    (StatusCode::OK, Json(response))
}
