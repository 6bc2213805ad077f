//! Application state shared across request handlers.

use repairdesk_core::{MemorySessionStore, ServiceDesk, SessionGate};
use tokio::sync::Mutex;

use crate::link::LinkMonitor;

pub(crate) struct AppState {
    /// The record list. Reads and writes both lock it.
    pub(crate) desk: Mutex<ServiceDesk>,
    /// Held for the length of a write. Writes take it with `try_lock`, so a
    /// second write while one is in flight is refused instead of queued.
    pub(crate) writes: Mutex<()>,
    /// Verifies the shared secret. The server keeps no per-client session;
    /// clients send the secret on every request.
    pub(crate) gate: SessionGate<MemorySessionStore>,
    pub(crate) link: LinkMonitor,
}

impl AppState {
    pub(crate) fn new(desk: ServiceDesk, secret: Option<String>, link: LinkMonitor) -> Self {
        AppState {
            desk: Mutex::new(desk),
            writes: Mutex::new(()),
            gate: SessionGate::restore(secret, MemorySessionStore::new()),
            link,
        }
    }
}
