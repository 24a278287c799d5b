/// Config schema types (install defaults, storage locations, startup sync).
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillbridgeConfig {
    pub install: InstallConfig,
    pub storage: StorageConfig,
    pub sync: SyncConfig,
}

/// Defaults applied when an install request names no platforms or scopes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Platform ids the user has chosen (e.g. `["claude", "cursor"]`).
    /// Empty means "not configured"; installs then fall back to a single
    /// built-in default platform.
    pub platforms: Vec<String>,
    /// Scopes used when a request names none. Defaults to `["global"]`.
    pub scopes: Vec<String>,
    /// Move a regular file out of the way (to `<target>.backup`) instead of
    /// refusing when it occupies a link target.
    pub backup_existing: bool,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            platforms: Vec::new(),
            scopes: vec!["global".into()],
            backup_existing: false,
        }
    }
}

/// Where the installation ledger and cloned repositories live.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// sqlx connection URL. Defaults to `sqlite://<data_dir>/skillbridge.db`.
    pub database_url: Option<String>,
    /// Root holding cloned `owner/repo` trees. Defaults to `<data_dir>/repositories`.
    pub repositories_dir: Option<PathBuf>,
}

impl StorageConfig {
    pub fn database_url_or_default(&self) -> String {
        self.database_url.clone().unwrap_or_else(|| {
            format!(
                "sqlite://{}?mode=rwc",
                crate::data_dir().join("skillbridge.db").display()
            )
        })
    }

    pub fn repositories_dir_or_default(&self) -> PathBuf {
        self.repositories_dir
            .clone()
            .unwrap_or_else(|| crate::data_dir().join("repositories"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Reconcile the ledger against the filesystem every time the CLI starts.
    pub on_startup: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { on_startup: true }
    }
}
