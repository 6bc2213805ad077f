//! In-process `RecordStore` backend.
//!
//! Used by tests, by `repairdesk --memory`, and as the reference backend for
//! the conformance suite. Rows live for the lifetime of the store.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::StorageError;
use crate::record::{NewServiceRow, ServicePatch, ServiceRow};
use crate::traits::RecordStore;

#[derive(Debug, Default)]
struct Table {
    next_id: i64,
    /// Kept in insertion order; listing reverses it.
    rows: Vec<ServiceRow>,
}

/// A `RecordStore` held entirely in memory.
///
/// Ids start at 1 and increase with every insert, so "newest first" is
/// descending id order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: Mutex<Table>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with rows, e.g. fixtures in tests.
    ///
    /// Rows are given oldest first; `next_id` continues after the largest id.
    pub fn with_rows(rows: Vec<ServiceRow>) -> Self {
        let next_id = rows.iter().map(|r| r.id).max().unwrap_or(0);
        MemoryStore {
            table: Mutex::new(Table { next_id, rows }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Table>, StorageError> {
        self.table
            .lock()
            .map_err(|e| StorageError::Backend(format!("memory store lock poisoned: {}", e)))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list_services(&self) -> Result<Vec<ServiceRow>, StorageError> {
        let table = self.lock()?;
        Ok(table.rows.iter().rev().cloned().collect())
    }

    async fn insert_service(&self, row: NewServiceRow) -> Result<ServiceRow, StorageError> {
        let created_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|e| StorageError::Backend(format!("timestamp formatting: {}", e)))?;

        let mut table = self.lock()?;
        table.next_id += 1;
        let stored = ServiceRow {
            id: table.next_id,
            created_at,
            customer_name: Some(row.customer_name),
            customer_phone: Some(row.customer_phone),
            deadline: row.deadline,
            high_priority: Some(row.high_priority),
            status: row.status,
            item_name: Some(row.item_name.into()),
            item_damage: Some(row.item_damage.into()),
            item_notes: Some(row.item_notes.into()),
        };
        table.rows.push(stored.clone());
        Ok(stored)
    }

    async fn update_service(&self, id: i64, patch: ServicePatch) -> Result<(), StorageError> {
        let mut table = self.lock()?;
        let row = table
            .rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StorageError::ServiceNotFound { id })?;
        patch.apply_to(row);
        Ok(())
    }

    async fn delete_service(&self, id: i64) -> Result<(), StorageError> {
        let mut table = self.lock()?;
        let before = table.rows.len();
        table.rows.retain(|r| r.id != id);
        if table.rows.len() == before {
            return Err(StorageError::ServiceNotFound { id });
        }
        Ok(())
    }
}
