//! `repairdesk serve` -- HTTP JSON API for the browser front-end.
//!
//! Exposes the service desk over `axum` + `tokio`. One desk is shared by all
//! requests. Writes also take a separate write token and refuse with 409 while
//! another write holds it; a slow list read only delays them.
//!
//! Endpoints:
//! - GET    /health                 - Server status (no auth)
//! - POST   /login                  - Check the shared secret (no auth)
//! - GET    /services               - Filtered, partitioned service list
//! - POST   /services               - Create a service
//! - PUT    /services/{id}          - Edit a service
//! - POST   /services/{id}/status   - Change status (needs `confirmed`)
//! - DELETE /services/{id}          - Delete a service (needs `?confirmed=true`)
//! - GET    /link                   - WhatsApp link status
//!
//! All responses use Content-Type: application/json.

mod handlers;
mod middleware;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{middleware as axum_middleware, Json, Router};
use repairdesk_core::{DeskError, GateError, ServiceDesk};
use repairdesk_storage::{RecordStore, StorageError};
use tower_http::cors::{Any, CorsLayer};

use self::handlers::{
    handle_change_status, handle_create_service, handle_delete_service, handle_health,
    handle_link, handle_list_services, handle_login, handle_not_found, handle_update_service,
};
use self::middleware::auth_middleware;
use self::state::AppState;
use crate::link::LinkMonitor;

/// Maximum request body size: 1 MB.
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

fn gate_error(err: GateError) -> impl IntoResponse {
    let status = match &err {
        GateError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        GateError::InvalidSecret => StatusCode::UNAUTHORIZED,
        GateError::Persist(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    json_error(status, &err.to_string())
}

fn desk_error(err: DeskError) -> Response {
    let status = match &err {
        DeskError::Transition(_) => StatusCode::CONFLICT,
        DeskError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DeskError::NotFound { .. } => StatusCode::NOT_FOUND,
        DeskError::Store {
            source: StorageError::ServiceNotFound { .. },
            ..
        } => StatusCode::NOT_FOUND,
        DeskError::Store { .. } => StatusCode::BAD_GATEWAY,
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }
    json_error(status, &err.to_string()).into_response()
}

/// Everything the server needs besides its listen address.
pub struct ServeOptions {
    pub store: Arc<dyn RecordStore>,
    pub secret: Option<String>,
    pub link_url: Option<String>,
}

/// Build the router over an already-assembled state.
fn app(state: Arc<AppState>) -> Router {
    // CORS: permissive, the front-end is served from a different origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/login", post(handle_login))
        .route(
            "/services",
            get(handle_list_services).post(handle_create_service),
        )
        .route(
            "/services/{id}",
            put(handle_update_service).delete(handle_delete_service),
        )
        .route("/services/{id}/status", post(handle_change_status))
        .route("/link", get(handle_link))
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// Start the HTTP server on the given port.
///
/// When TLS cert/key paths are provided, the server listens over HTTPS
/// using `axum-server` with rustls. Otherwise it uses plain HTTP.
pub async fn start_server(
    port: u16,
    options: ServeOptions,
    _tls_cert: Option<PathBuf>,
    _tls_key: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut desk = ServiceDesk::new(options.store);
    match desk.refresh().await {
        Ok(records) => tracing::info!(count = records.len(), "loaded services"),
        Err(e) => tracing::warn!(error = %e, "initial load failed; will retry on first request"),
    }

    if options.secret.is_none() {
        tracing::warn!("no shared secret configured; only /health and /login are reachable");
    }

    let link = LinkMonitor::start(options.link_url.as_deref());
    let state = Arc::new(AppState::new(desk, options.secret, link));
    let router = app(state);

    let addr = format!("0.0.0.0:{}", port);

    // TLS support via axum-server + rustls (requires `tls` feature)
    #[cfg(feature = "tls")]
    if let (Some(cert_path), Some(key_path)) = (&_tls_cert, &_tls_key) {
        let config =
            axum_server::tls_rustls::RustlsConfig::from_pem_file(cert_path, key_path).await?;
        let socket_addr: std::net::SocketAddr = addr.parse()?;
        tracing::info!(port, "repairdesk listening on https");
        axum_server::bind_rustls(socket_addr, config)
            .serve(router.into_make_service())
            .await?;
        return Ok(());
    }

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(port, "repairdesk listening on http");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}

#[cfg(test)]
mod tests;
