//! repairdesk-core: service-intake domain for a repair shop.
//!
//! The record store is behind [`repairdesk_storage::RecordStore`]; everything
//! here is store-agnostic.
//!
//! # Public API
//!
//! Key types are re-exported at the crate root for convenience:
//!
//! - [`ServiceRecord`], [`LineItem`], [`Status`] -- the record model
//! - [`check_transition`] -- forward-only status lifecycle
//! - [`Editor`] -- draft editing and validation
//! - [`filter_records`] / [`partition`] -- search and active/history split
//! - [`SessionGate`] -- shared-secret login flag
//! - [`LinkViewer`] -- WhatsApp link status
//! - [`ServiceDesk`] -- the record list and the writes that change it

pub mod deadline;
pub mod desk;
pub mod editor;
pub mod filter;
pub mod lifecycle;
pub mod link;
pub mod record;
pub mod session;

// ── Convenience re-exports ───────────────────────────────────────────

pub use deadline::{urgency, Urgency};
pub use desk::{DeskError, ServiceDesk, StatusChange};
pub use editor::{Draft, Editor, ItemField, Submission, ValidationError};
pub use filter::{filter_records, partition, Partitioned, StatusFilter, Tab};
pub use lifecycle::{check_transition, Always, Confirm, Transition, TransitionError};
pub use link::{LinkEvent, LinkState, LinkViewer};
pub use record::{Bucket, DecodeError, LineItem, ServiceRecord, Status, UnknownStatus};
pub use session::{GateError, MemorySessionStore, SessionGate, SessionStore};
