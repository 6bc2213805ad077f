//! HTTP middleware: shared-secret authentication.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use repairdesk_core::GateError;

use super::state::AppState;

/// Routes reachable without the secret.
const PUBLIC_PATHS: [&str; 2] = ["/health", "/login"];

/// Shared-secret authentication middleware.
///
/// Every request except [`PUBLIC_PATHS`] must carry the secret as either
/// `Authorization: Bearer <secret>` or `X-API-Key: <secret>`. With no secret
/// configured nothing past the public routes is reachable.
pub(crate) async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if PUBLIC_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let headers = request.headers();
    let presented = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .or_else(|| headers.get("x-api-key").and_then(|v| v.to_str().ok()));

    let Some(presented) = presented else {
        if !state.gate.is_configured() {
            return super::gate_error(GateError::NotConfigured).into_response();
        }
        return super::json_error(StatusCode::UNAUTHORIZED, "authentication required")
            .into_response();
    };

    let verdict = state.gate.verify(presented);
    match verdict {
        Ok(()) => next.run(request).await,
        Err(GateError::InvalidSecret) => {
            super::json_error(StatusCode::FORBIDDEN, "invalid secret").into_response()
        }
        Err(e) => super::gate_error(e).into_response(),
    }
}
