//! Runtime configuration: environment variables over an optional TOML file.
//!
//! # Example
//!
//! ```toml
//! [store]
//! url = "https://abcd.supabase.co"
//! key = "anon-key"
//!
//! [link]
//! url = "https://example.ngrok-free.app"
//!
//! [session]
//! secret = "shop-secret"
//! state_dir = ".repairdesk"
//! ```
//!
//! Every key can be overridden by its `REPAIRDESK_*` variable. Empty values
//! count as unset.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use repairdesk_storage::{MemoryStore, PostgrestStore, RecordStore};
use serde::Deserialize;

pub const ENV_STORE_URL: &str = "REPAIRDESK_STORE_URL";
pub const ENV_STORE_KEY: &str = "REPAIRDESK_STORE_KEY";
pub const ENV_LINK_URL: &str = "REPAIRDESK_LINK_URL";
pub const ENV_SHARED_SECRET: &str = "REPAIRDESK_SHARED_SECRET";
pub const ENV_STATE_DIR: &str = "REPAIRDESK_STATE_DIR";

pub const DEFAULT_STATE_DIR: &str = ".repairdesk";

// ── File format ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub store: StoreSection,
    pub link: LinkSection,
    pub session: SessionSection,
}

/// `[store]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    pub url: Option<String>,
    pub key: Option<String>,
}

/// `[link]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkSection {
    pub url: Option<String>,
}

/// `[session]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionSection {
    pub secret: Option<String>,
    pub state_dir: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error(
        "record store is not configured; set REPAIRDESK_STORE_URL and REPAIRDESK_STORE_KEY, or pass --memory"
    )]
    MissingStore,
}

pub fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

// ── Resolved configuration ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub store_url: Option<String>,
    pub store_key: Option<String>,
    pub link_url: Option<String>,
    pub shared_secret: Option<String>,
    pub state_dir: PathBuf,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load from the process environment and, if given, a TOML file.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let file = match path {
            Some(p) => read_file_config(p)?,
            None => FileConfig::default(),
        };
        Ok(Config::resolve(file, |key| std::env::var(key).ok()))
    }

    /// Merge `file` with variables looked up through `env`. Env wins.
    pub fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Config {
        let pick = |key: &str, fallback: Option<String>| non_empty(env(key)).or(non_empty(fallback));
        let state_dir = non_empty(env(ENV_STATE_DIR))
            .map(PathBuf::from)
            .or(file.session.state_dir.filter(|p| !p.as_os_str().is_empty()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR));
        Config {
            store_url: pick(ENV_STORE_URL, file.store.url),
            store_key: pick(ENV_STORE_KEY, file.store.key),
            link_url: pick(ENV_LINK_URL, file.link.url),
            shared_secret: pick(ENV_SHARED_SECRET, file.session.secret),
            state_dir,
        }
    }

    pub fn session_path(&self) -> PathBuf {
        self.state_dir.join("session.json")
    }

    /// The record store to use: in-memory when asked, the hosted store
    /// otherwise.
    pub fn open_store(&self, memory: bool) -> Result<Arc<dyn RecordStore>, ConfigError> {
        if memory {
            tracing::debug!("using in-memory record store");
            return Ok(Arc::new(MemoryStore::new()));
        }
        match (&self.store_url, &self.store_key) {
            (Some(url), Some(key)) => {
                tracing::debug!(url = %url, "using hosted record store");
                Ok(Arc::new(PostgrestStore::new(url, key)))
            }
            _ => Err(ConfigError::MissingStore),
        }
    }
}
