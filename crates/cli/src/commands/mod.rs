//! Subcommand implementations.
//!
//! Each `cmd_*` function reports its own errors through [`report_error`] and
//! exits non-zero on failure, like the rest of the binary.

mod link;
mod services;
mod session;

use std::future::Future;
use std::io::{BufRead, Write};
use std::process;

use repairdesk_core::{Confirm, ServiceDesk, SessionGate};
use tokio::runtime::Runtime;

use crate::config::Config;
use crate::session_file::FileSessionStore;
use crate::{report_error, OutputFormat};

pub(crate) use link::cmd_link;
pub(crate) use services::{cmd_add, cmd_delete, cmd_edit, cmd_list, cmd_status, EditArgs};
pub(crate) use session::{cmd_login, cmd_logout};

/// What every subcommand needs besides its own arguments.
pub(crate) struct Context {
    pub config: Config,
    pub memory: bool,
    pub output: OutputFormat,
    pub quiet: bool,
}

impl Context {
    /// Report `msg` and exit 1.
    pub fn fail(&self, msg: &str) -> ! {
        report_error(msg, self.output, self.quiet);
        process::exit(1);
    }

    pub fn gate(&self) -> SessionGate<FileSessionStore> {
        SessionGate::restore(
            self.config.shared_secret.clone(),
            FileSessionStore::new(self.config.session_path()),
        )
    }

    /// Exit unless a session is active.
    pub fn require_login(&self) {
        if !self.gate().is_authenticated() {
            self.fail("not logged in; run `repairdesk login` first");
        }
    }

    pub fn runtime(&self) -> Runtime {
        match Runtime::new() {
            Ok(rt) => rt,
            Err(e) => self.fail(&format!("failed to create tokio runtime: {}", e)),
        }
    }

    /// Open the configured store and load the current list.
    pub fn desk(&self, rt: &Runtime) -> ServiceDesk {
        let store = match self.config.open_store(self.memory) {
            Ok(s) => s,
            Err(e) => self.fail(&e.to_string()),
        };
        let mut desk = ServiceDesk::new(store);
        self.block(rt, async {
            desk.refresh().await.map(|_| ())
        });
        desk
    }

    /// Run `fut` to completion, exiting on error.
    pub fn block<T, E: std::fmt::Display>(
        &self,
        rt: &Runtime,
        fut: impl Future<Output = Result<T, E>>,
    ) -> T {
        match rt.block_on(fut) {
            Ok(v) => v,
            Err(e) => self.fail(&e.to_string()),
        }
    }

    /// Print a plain-text line unless `--quiet`; JSON output goes through
    /// [`Context::json`] instead.
    pub fn say(&self, line: &str) {
        if !self.quiet && self.output == OutputFormat::Text {
            println!("{}", line);
        }
    }

    pub fn json(&self, value: &serde_json::Value) {
        if self.output == OutputFormat::Json {
            let json = serde_json::to_string_pretty(value)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
    }
}

/// Asks on stderr and reads a `y`/`yes` answer from stdin.
pub(crate) struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        eprint!("{} [y/N] ", prompt);
        let _ = std::io::stderr().flush();
        let mut input = String::new();
        if std::io::stdin().lock().read_line(&mut input).is_err() {
            return false;
        }
        matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}
