//! Hosted `RecordStore` backend speaking the PostgREST dialect.
//!
//! Uses `ureq` (sync) wrapped in `tokio::task::spawn_blocking` to avoid
//! blocking the async runtime. Every request carries the project key both as
//! `apikey` and as a bearer token, which is what hosted PostgREST gateways
//! expect for anonymous-key access.
//!
//! - list:   `GET    {base}/rest/v1/{table}?select=*&order=created_at.desc`
//! - insert: `POST   {base}/rest/v1/{table}` with `Prefer: return=representation`
//! - update: `PATCH  {base}/rest/v1/{table}?id=eq.{id}`
//! - delete: `DELETE {base}/rest/v1/{table}?id=eq.{id}`

use async_trait::async_trait;
use ureq::http::Response;
use ureq::Body;

use crate::error::StorageError;
use crate::record::{NewServiceRow, ServicePatch, ServiceRow};
use crate::traits::RecordStore;

/// Default table holding service rows.
pub const DEFAULT_TABLE: &str = "services";

/// A `RecordStore` backed by a hosted PostgREST endpoint.
#[derive(Debug, Clone)]
pub struct PostgrestStore {
    base_url: String,
    api_key: String,
    table: String,
    agent: ureq::Agent,
}

impl PostgrestStore {
    /// Create a store for `base_url` (the project URL, without `/rest/v1`).
    pub fn new(base_url: &str, api_key: &str) -> Self {
        // Non-2xx responses carry a JSON error body we want to surface.
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build();
        PostgrestStore {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            table: DEFAULT_TABLE.to_string(),
            agent: ureq::Agent::new_with_config(config),
        }
    }

    /// Use a table other than [`DEFAULT_TABLE`].
    pub fn with_table(mut self, table: &str) -> Self {
        self.table = table.to_string();
        self
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn row_url(&self, id: i64) -> String {
        format!("{}?id=eq.{}", self.table_url(), id)
    }

    /// Run a blocking request closure on the blocking pool.
    async fn run<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&PostgrestStore) -> Result<T, StorageError> + Send + 'static,
    {
        let this = self.clone();
        tokio::task::spawn_blocking(move || f(&this))
            .await
            .map_err(|e| StorageError::Backend(format!("task join error: {}", e)))?
    }
}

#[async_trait]
impl RecordStore for PostgrestStore {
    async fn list_services(&self) -> Result<Vec<ServiceRow>, StorageError> {
        self.run(|s| {
            let url = format!("{}?select=*&order=created_at.desc", s.table_url());
            let response = s
                .agent
                .get(&url)
                .header("apikey", &s.api_key)
                .header("Authorization", &format!("Bearer {}", s.api_key))
                .call()
                .map_err(transport_error)?;
            read_rows(expect_success(response)?)
        })
        .await
    }

    async fn insert_service(&self, row: NewServiceRow) -> Result<ServiceRow, StorageError> {
        self.run(move |s| {
            let response = s
                .agent
                .post(&s.table_url())
                .header("apikey", &s.api_key)
                .header("Authorization", &format!("Bearer {}", s.api_key))
                .header("Prefer", "return=representation")
                .send_json(&row)
                .map_err(transport_error)?;
            read_rows(expect_success(response)?)?
                .into_iter()
                .next()
                .ok_or_else(|| StorageError::Backend("insert returned no row".to_string()))
        })
        .await
    }

    async fn update_service(&self, id: i64, patch: ServicePatch) -> Result<(), StorageError> {
        self.run(move |s| {
            let response = s
                .agent
                .patch(&s.row_url(id))
                .header("apikey", &s.api_key)
                .header("Authorization", &format!("Bearer {}", s.api_key))
                .header("Prefer", "return=representation")
                .send_json(&patch)
                .map_err(transport_error)?;
            let rows = read_rows(expect_success(response)?)?;
            require_match(&rows, id)
        })
        .await
    }

    async fn delete_service(&self, id: i64) -> Result<(), StorageError> {
        self.run(move |s| {
            let response = s
                .agent
                .delete(&s.row_url(id))
                .header("apikey", &s.api_key)
                .header("Authorization", &format!("Bearer {}", s.api_key))
                .header("Prefer", "return=representation")
                .call()
                .map_err(transport_error)?;
            let rows = read_rows(expect_success(response)?)?;
            require_match(&rows, id)
        })
        .await
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn transport_error(err: ureq::Error) -> StorageError {
    StorageError::Backend(format!("request failed: {}", err))
}

/// Pass 2xx responses through; turn anything else into `Rejected`.
fn expect_success(mut response: Response<Body>) -> Result<Response<Body>, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.body_mut().read_to_string().unwrap_or_default();
    tracing::debug!(status = status.as_u16(), body = %body, "store rejected request");
    Err(StorageError::Rejected {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

fn read_rows(response: Response<Body>) -> Result<Vec<ServiceRow>, StorageError> {
    response
        .into_body()
        .read_json::<Vec<ServiceRow>>()
        .map_err(|e| StorageError::Backend(format!("failed to parse response as rows: {}", e)))
}

/// An update or delete with `return=representation` echoes the affected rows;
/// an empty echo means the id matched nothing.
fn require_match(rows: &[ServiceRow], id: i64) -> Result<(), StorageError> {
    if rows.is_empty() {
        Err(StorageError::ServiceNotFound { id })
    } else {
        Ok(())
    }
}

/// Extract the human-readable message from a PostgREST error body.
///
/// Error bodies look like `{"code": "...", "message": "...", "details": ...}`.
/// Falls back to the raw body, then to a placeholder.
fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    if let Some(msg) = parsed
        .as_ref()
        .and_then(|v| v.get("message"))
        .and_then(|m| m.as_str())
    {
        return msg.to_string();
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "empty error response".to_string()
    } else {
        trimmed.to_string()
    }
}
