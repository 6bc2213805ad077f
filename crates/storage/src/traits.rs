use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::{NewServiceRow, ServicePatch, ServiceRow};

/// The storage trait for repairdesk record backends.
///
/// A `RecordStore` is a CRUD client over a single collection of service rows
/// keyed by `id`. The store assigns `id` and `created_at` on insert.
///
/// ## Ordering
///
/// `list_services` returns rows newest first (`created_at` descending).
/// Consumers display rows in exactly this order.
///
/// ## Concurrency
///
/// There is no optimistic concurrency control: two writers updating the same
/// row both succeed and the last write wins.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be used in axum
/// application state and across async task boundaries.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// List every service row, newest first.
    async fn list_services(&self) -> Result<Vec<ServiceRow>, StorageError>;

    /// Insert one row and return it as stored (with `id` and `created_at`).
    async fn insert_service(&self, row: NewServiceRow) -> Result<ServiceRow, StorageError>;

    /// Apply a partial update to the row with the given id.
    ///
    /// Returns `Err(StorageError::ServiceNotFound)` if no row matched.
    async fn update_service(&self, id: i64, patch: ServicePatch) -> Result<(), StorageError>;

    /// Permanently delete the row with the given id.
    ///
    /// Returns `Err(StorageError::ServiceNotFound)` if no row matched.
    async fn delete_service(&self, id: i64) -> Result<(), StorageError>;
}
