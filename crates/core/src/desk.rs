//! The service desk: the record list plus every write that changes it.
//!
//! Writes go to the store first and the list is refetched afterwards, so the
//! held records only ever reflect what the store confirmed. A failed write
//! leaves the list as it was.

use std::sync::Arc;

use repairdesk_storage::{RecordStore, ServicePatch, StorageError};

use crate::editor::{Editor, Submission, ValidationError};
use crate::filter::{filter_records, partition, Partitioned, StatusFilter};
use crate::lifecycle::{check_transition, confirmation_prompt, Confirm, Transition, TransitionError};
use crate::record::{ServiceRecord, Status};

#[derive(Debug, thiserror::Error)]
pub enum DeskError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("could not {operation}: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: StorageError,
    },
    #[error("service {id} not found")]
    NotFound { id: i64 },
}

fn store_err(operation: &'static str) -> impl FnOnce(StorageError) -> DeskError {
    move |source| DeskError::Store { operation, source }
}

/// Result of a status change that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// Same status requested; no request was made.
    Unchanged,
    /// The operator said no; no request was made.
    Declined,
    Applied { from: Status, to: Status },
}

pub struct ServiceDesk {
    store: Arc<dyn RecordStore>,
    records: Vec<ServiceRecord>,
}

impl ServiceDesk {
    /// An empty desk. Call [`ServiceDesk::refresh`] to load.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        ServiceDesk {
            store,
            records: Vec::new(),
        }
    }

    /// Refetch every record, newest first.
    ///
    /// Rows that do not decode are skipped with a warning so one bad row does
    /// not hide the rest.
    pub async fn refresh(&mut self) -> Result<&[ServiceRecord], DeskError> {
        let rows = self.store.list_services().await.map_err(store_err("load services"))?;
        let total = rows.len();
        let records: Vec<ServiceRecord> = rows
            .into_iter()
            .filter_map(|row| match ServiceRecord::from_row(row) {
                Ok(r) => Some(r),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping service row");
                    None
                }
            })
            .collect();
        tracing::debug!(total, loaded = records.len(), "refreshed services");
        self.records = records;
        Ok(&self.records)
    }

    /// Refresh after a confirmed write. The write already happened, so a
    /// failed reload only leaves the previous list on display.
    async fn refresh_after_write(&mut self) {
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "write succeeded but the list could not be reloaded");
        }
    }

    pub fn records(&self) -> &[ServiceRecord] {
        &self.records
    }

    pub fn find(&self, id: i64) -> Option<&ServiceRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    fn require(&self, id: i64) -> Result<&ServiceRecord, DeskError> {
        self.find(id).ok_or(DeskError::NotFound { id })
    }

    /// Filtered and partitioned view of the held records.
    pub fn view(&self, query: &str, filter: StatusFilter) -> Partitioned<'_> {
        partition(&filter_records(&self.records, query, filter))
    }

    /// Save the editor's draft and refresh. Returns the saved record's id.
    ///
    /// Validation failures never reach the store.
    pub async fn submit(&mut self, editor: &Editor) -> Result<i64, DeskError> {
        let id = match editor.submission()? {
            Submission::Insert(row) => {
                let stored = self
                    .store
                    .insert_service(row)
                    .await
                    .map_err(store_err("save service"))?;
                tracing::info!(id = stored.id, "service created");
                stored.id
            }
            Submission::Update { id, patch } => {
                self.store
                    .update_service(id, patch)
                    .await
                    .map_err(store_err("save service"))?;
                tracing::info!(id, "service updated");
                id
            }
        };
        self.refresh_after_write().await;
        Ok(id)
    }

    /// Move a record to `requested`.
    ///
    /// Regressions are rejected before anything is asked. Allowed changes are
    /// put to `confirm`; only a yes results in exactly one status-only update.
    pub async fn change_status(
        &mut self,
        id: i64,
        requested: Status,
        confirm: &mut impl Confirm,
    ) -> Result<StatusChange, DeskError> {
        let current = self.require(id)?.status;
        let (from, to) = match check_transition(current, requested) {
            Transition::Unchanged => return Ok(StatusChange::Unchanged),
            Transition::Rejected(e) => {
                tracing::debug!(id, error = %e, "status change rejected");
                return Err(e.into());
            }
            Transition::NeedsConfirmation { from, to } => (from, to),
        };
        if !confirm.confirm(&confirmation_prompt(from, to)) {
            return Ok(StatusChange::Declined);
        }
        self.store
            .update_service(id, ServicePatch::status(to.label()))
            .await
            .map_err(store_err("change status"))?;
        tracing::info!(id, %from, %to, "status changed");
        self.refresh_after_write().await;
        Ok(StatusChange::Applied { from, to })
    }

    /// Permanently delete a record after confirmation.
    ///
    /// Returns `false` when the operator declined.
    pub async fn delete(&mut self, id: i64, confirm: &mut impl Confirm) -> Result<bool, DeskError> {
        let record = self.require(id)?;
        let prompt = format!(
            "Delete service #{} for \"{}\"? This cannot be undone.",
            record.id, record.customer_name
        );
        if !confirm.confirm(&prompt) {
            return Ok(false);
        }
        self.store
            .delete_service(id)
            .await
            .map_err(store_err("delete service"))?;
        tracing::info!(id, "service deleted");
        self.refresh_after_write().await;
        Ok(true)
    }
}
