//! Shared checks every `RecordStore` backend must pass.
//!
//! Each check gets a fresh, empty store from the caller's factory. The checks
//! are grouped by operation (`insert`, `update`, `delete`); listing order is
//! checked alongside insert.
//!
//! ```ignore
//! use repairdesk_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn memory_conformance() {
//!     let report = run_conformance_suite(|| async { MemoryStore::new() }).await;
//!     assert!(report.is_clean(), "{report}");
//! }
//! ```

mod delete;
mod insert;
mod update;

use std::fmt;
use std::future::Future;

use crate::record::NewServiceRow;
use crate::RecordStore;

/// Outcome of one check. `failure` holds the reason when it did not hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseResult {
    pub operation: &'static str,
    pub case: &'static str,
    pub failure: Option<String>,
}

impl CaseResult {
    fn new(operation: &'static str, case: &'static str, outcome: Result<(), String>) -> Self {
        CaseResult {
            operation,
            case,
            failure: outcome.err(),
        }
    }
}

/// Every check run against one backend.
#[derive(Debug, Clone, Default)]
pub struct ConformanceReport {
    pub cases: Vec<CaseResult>,
}

impl ConformanceReport {
    pub fn total(&self) -> usize {
        self.cases.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseResult> {
        self.cases.iter().filter(|c| c.failure.is_some())
    }

    /// True when at least one check ran and none failed.
    pub fn is_clean(&self) -> bool {
        self.total() > 0 && self.failures().next().is_none()
    }
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed = self.failures().count();
        writeln!(f, "{} of {} store checks failed", failed, self.total())?;
        for c in self.failures() {
            let reason = c.failure.as_deref().unwrap_or_default();
            writeln!(f, "  {}::{}: {}", c.operation, c.case, reason)?;
        }
        Ok(())
    }
}

/// Run every check against the backend built by `factory`.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut cases = insert::run_insert_tests(&factory).await;
    cases.extend(update::run_update_tests(&factory).await);
    cases.extend(delete::run_delete_tests(&factory).await);
    ConformanceReport { cases }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn make_new_row(customer: &str, items: &[(&str, &str, &str)]) -> NewServiceRow {
    NewServiceRow {
        customer_name: customer.to_string(),
        customer_phone: "081234567890".to_string(),
        high_priority: false,
        deadline: None,
        status: "Intake".to_string(),
        item_name: items.iter().map(|i| i.0.to_string()).collect(),
        item_damage: items.iter().map(|i| i.1.to_string()).collect(),
        item_notes: items.iter().map(|i| i.2.to_string()).collect(),
    }
}
