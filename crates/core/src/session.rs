//! Shared-secret session gate.
//!
//! One boolean flag, persisted through a [`SessionStore`]. The secret is a
//! single static value for the whole deployment; the flag is a convenience so
//! the operator is not asked again after a restart.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

/// Durable storage for the authenticated flag.
pub trait SessionStore: Send + Sync {
    /// `true` when a previous login left the flag set.
    fn load(&self) -> bool;
    fn save(&self) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;
}

/// Volatile flag, for tests and for the HTTP server where the flag lives only
/// as long as the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    flag: AtomicBool,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logged_in() -> Self {
        MemorySessionStore {
            flag: AtomicBool::new(true),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn save(&self) -> io::Result<()> {
        self.flag.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        self.flag.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("no shared secret is configured; set REPAIRDESK_SHARED_SECRET")]
    NotConfigured,
    #[error("invalid secret")]
    InvalidSecret,
    #[error("failed to persist session: {0}")]
    Persist(#[from] io::Error),
}

/// The login gate.
pub struct SessionGate<S> {
    secret: Option<String>,
    store: S,
    authenticated: bool,
}

impl<S: SessionStore> SessionGate<S> {
    /// Build the gate and restore a persisted login.
    ///
    /// An empty secret is treated the same as no secret.
    pub fn restore(secret: Option<String>, store: S) -> Self {
        let secret = secret.filter(|s| !s.is_empty());
        let authenticated = store.load();
        if authenticated {
            tracing::debug!("restored persisted session");
        }
        SessionGate {
            secret,
            store,
            authenticated,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Compare `entered` against the configured secret without touching the
    /// flag.
    pub fn verify(&self, entered: &str) -> Result<(), GateError> {
        match &self.secret {
            None => Err(GateError::NotConfigured),
            Some(secret) if secret == entered => Ok(()),
            Some(_) => Err(GateError::InvalidSecret),
        }
    }

    /// Check `entered`, and on a match persist the flag and unlock.
    ///
    /// On mismatch the flag is left as it was.
    pub fn login(&mut self, entered: &str) -> Result<(), GateError> {
        if let Err(e) = self.verify(entered) {
            tracing::warn!(error = %e, "login refused");
            return Err(e);
        }
        self.store.save()?;
        self.authenticated = true;
        tracing::info!("logged in");
        Ok(())
    }

    /// Clear the flag unconditionally.
    pub fn logout(&mut self) -> Result<(), GateError> {
        self.authenticated = false;
        self.store.clear()?;
        tracing::info!("logged out");
        Ok(())
    }
}
