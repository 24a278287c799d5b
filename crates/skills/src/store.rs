//! Persistence trait for skills, sources, and the installation ledger.

use std::path::Path;

use async_trait::async_trait;

use crate::{
    Result,
    scope::Scope,
    types::{InstallationRecord, Skill, Source},
};

/// Persistence backend. Every call is atomic on its own; callers never rely on
/// a transaction spanning several calls.
#[async_trait]
pub trait SkillStore: Send + Sync {
    async fn get_skill(&self, id: &str) -> Result<Option<Skill>>;
    async fn get_skill_by_slug(&self, slug: &str) -> Result<Option<Skill>>;
    async fn get_all_skills(&self) -> Result<Vec<Skill>>;
    async fn upsert_skill(&self, skill: &Skill) -> Result<()>;
    async fn get_source(&self, id: &str) -> Result<Option<Source>>;
    async fn upsert_source(&self, source: &Source) -> Result<()>;

    /// Fails with [`crate::Error::SkillNotFound`] for an unknown skill.
    async fn set_installed(&self, skill_id: &str, installed: bool) -> Result<()>;

    /// Insert a record, or update the link path of the record already stored
    /// for the same (skill, platform, scope, base path).
    async fn add_installation(&self, record: &InstallationRecord) -> Result<()>;
    async fn remove_installation(
        &self,
        skill_id: &str,
        platform: &str,
        scope: Scope,
        base_path: &Path,
    ) -> Result<()>;
    async fn remove_all_installations(&self, skill_id: &str) -> Result<()>;
    async fn get_installations(&self, skill_id: &str) -> Result<Vec<InstallationRecord>>;
    async fn get_all_installations(&self) -> Result<Vec<InstallationRecord>>;
    async fn has_installations(&self, skill_id: &str) -> Result<bool>;
}
