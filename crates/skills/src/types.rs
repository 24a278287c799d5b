use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{location::InstallLocation, scope::Scope};

// ── Skills and sources ───────────────────────────────────────────────────────

/// An installable skill as known to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    /// Unique, user-facing name; also the link name on disk.
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Path of the skill's `SKILL.md`: relative to its source repository, or
    /// absolute for local skills. The link source is its parent directory.
    pub file_path: String,
    #[serde(default)]
    pub is_local: bool,
    #[serde(default)]
    pub source_id: Option<String>,
    /// Mirrors "has at least one installation record".
    #[serde(default)]
    pub is_installed: bool,
}

impl Skill {
    /// Directory holding the skill's content, relative to its source root for
    /// repository skills.
    pub fn content_dir(&self) -> PathBuf {
        Path::new(&self.file_path)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }
}

/// A cloned `owner/repo` repository that skills are drawn from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub owner: String,
    pub repo: String,
}

impl Source {
    /// Checkout directory under `repositories_dir`.
    pub fn repo_dir(&self, repositories_dir: &Path) -> PathBuf {
        repositories_dir.join(&self.owner).join(&self.repo)
    }
}

// ── Installation ledger ──────────────────────────────────────────────────────

/// One ledger entry asserting that a skill is linked at a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationRecord {
    pub skill_id: String,
    pub platform: String,
    pub scope: Scope,
    pub base_path: PathBuf,
    pub symlink_path: PathBuf,
    pub installed_at_ms: u64,
}

impl InstallationRecord {
    pub fn new(skill_id: impl Into<String>, location: &InstallLocation, symlink_path: PathBuf) -> Self {
        Self {
            skill_id: skill_id.into(),
            platform: location.platform.clone(),
            scope: location.scope,
            base_path: location.base_path.clone(),
            symlink_path,
            installed_at_ms: now_ms(),
        }
    }

    pub fn location(&self) -> InstallLocation {
        InstallLocation::new(self.platform.clone(), self.scope, self.base_path.clone())
    }

    pub(crate) fn ledger_key(&self) -> (String, Scope, PathBuf) {
        (self.platform.clone(), self.scope, self.base_path.clone())
    }
}

pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// ── Operation outcomes ───────────────────────────────────────────────────────

/// A location that could not be processed, and why.
#[derive(Debug, Clone, Serialize)]
pub struct LocationFailure {
    pub location: InstallLocation,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Installed { symlink_path: PathBuf },
    /// The platform has no skills directory.
    Skipped,
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationOutcome {
    pub location: InstallLocation,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

/// Per-location result of an install call that linked at least one location.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub skill_id: String,
    pub slug: String,
    pub outcomes: Vec<LocationOutcome>,
}

impl InstallReport {
    pub fn installed(&self) -> impl Iterator<Item = &InstallLocation> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, OutcomeStatus::Installed { .. }))
            .map(|o| &o.location)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &InstallLocation> {
        self.outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Skipped)
            .map(|o| &o.location)
    }

    pub fn failures(&self) -> Vec<LocationFailure> {
        collect_failures(&self.outcomes)
    }
}

pub(crate) fn collect_failures(outcomes: &[LocationOutcome]) -> Vec<LocationFailure> {
    outcomes
        .iter()
        .filter_map(|o| match &o.status {
            OutcomeStatus::Failed { reason } => Some(LocationFailure {
                location: o.location.clone(),
                reason: reason.clone(),
            }),
            _ => None,
        })
        .collect()
}

/// What a reconciliation pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub records_added: usize,
    pub records_removed: usize,
    pub flags_updated: usize,
    /// Directories or skills that could not be processed and were skipped.
    pub units_skipped: usize,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.records_added == 0 && self.records_removed == 0 && self.flags_updated == 0
    }
}
