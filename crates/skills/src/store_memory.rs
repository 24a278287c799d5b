//! In-memory store for tests and embedding.

use std::{
    collections::HashMap,
    path::Path,
    sync::{
        RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;

use crate::{
    Error, Result,
    scope::Scope,
    store::SkillStore,
    types::{InstallationRecord, Skill, Source},
};

#[derive(Default)]
struct Inner {
    skills: HashMap<String, Skill>,
    sources: HashMap<String, Source>,
    installations: Vec<InstallationRecord>,
}

/// `HashMap`-backed store. No persistence.
///
/// Writes can be made to fail on demand, which is how the installer's
/// rollback paths are exercised.
#[derive(Default)]
pub struct InMemorySkillStore {
    inner: RwLock<Inner>,
    fail_set_installed: AtomicBool,
    fail_add_installation: AtomicBool,
}

impl InMemorySkillStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set_installed` call fail.
    pub fn fail_set_installed(&self, fail: bool) {
        self.fail_set_installed.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `add_installation` call fail.
    pub fn fail_add_installation(&self, fail: bool) {
        self.fail_add_installation.store(fail, Ordering::SeqCst);
    }
}

fn injected(op: &str) -> Error {
    Error::message(format!("{op}: injected store failure"))
}

#[async_trait]
impl SkillStore for InMemorySkillStore {
    async fn get_skill(&self, id: &str) -> Result<Option<Skill>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(inner.skills.get(id).cloned())
    }

    async fn get_skill_by_slug(&self, slug: &str) -> Result<Option<Skill>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(inner.skills.values().find(|s| s.slug == slug).cloned())
    }

    async fn get_all_skills(&self) -> Result<Vec<Skill>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut skills: Vec<Skill> = inner.skills.values().cloned().collect();
        skills.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(skills)
    }

    async fn upsert_skill(&self, skill: &Skill) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.skills.insert(skill.id.clone(), skill.clone());
        Ok(())
    }

    async fn get_source(&self, id: &str) -> Result<Option<Source>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(inner.sources.get(id).cloned())
    }

    async fn upsert_source(&self, source: &Source) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.sources.insert(source.id.clone(), source.clone());
        Ok(())
    }

    async fn set_installed(&self, skill_id: &str, installed: bool) -> Result<()> {
        if self.fail_set_installed.load(Ordering::SeqCst) {
            return Err(injected("set_installed"));
        }
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let skill = inner
            .skills
            .get_mut(skill_id)
            .ok_or_else(|| Error::skill_not_found(skill_id))?;
        skill.is_installed = installed;
        Ok(())
    }

    async fn add_installation(&self, record: &InstallationRecord) -> Result<()> {
        if self.fail_add_installation.load(Ordering::SeqCst) {
            return Err(injected("add_installation"));
        }
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let key = record.ledger_key();
        match inner
            .installations
            .iter_mut()
            .find(|r| r.skill_id == record.skill_id && r.ledger_key() == key)
        {
            Some(existing) => *existing = record.clone(),
            None => inner.installations.push(record.clone()),
        }
        Ok(())
    }

    async fn remove_installation(
        &self,
        skill_id: &str,
        platform: &str,
        scope: Scope,
        base_path: &Path,
    ) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.installations.retain(|r| {
            !(r.skill_id == skill_id
                && r.platform == platform
                && r.scope == scope
                && r.base_path == base_path)
        });
        Ok(())
    }

    async fn remove_all_installations(&self, skill_id: &str) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.installations.retain(|r| r.skill_id != skill_id);
        Ok(())
    }

    async fn get_installations(&self, skill_id: &str) -> Result<Vec<InstallationRecord>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(inner
            .installations
            .iter()
            .filter(|r| r.skill_id == skill_id)
            .cloned()
            .collect())
    }

    async fn get_all_installations(&self) -> Result<Vec<InstallationRecord>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(inner.installations.clone())
    }

    async fn has_installations(&self, skill_id: &str) -> Result<bool> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(inner.installations.iter().any(|r| r.skill_id == skill_id))
    }
}
