//! Rebuild the installation ledger from the links actually on disk.
//!
//! Every platform/scope skills directory is scanned for symlinks. Each link
//! name is mapped to a stored skill, and the per-skill result is diffed
//! against the ledger: links with no record gain one, records whose link is
//! gone are dropped, and `is_installed` is recomputed. A directory or skill
//! that fails is logged and skipped so one bad entry never blocks the rest.

use std::{
    collections::{HashMap, HashSet},
    fs,
    path::PathBuf,
};

use {
    async_trait::async_trait,
    tracing::{debug, info, warn},
};

use crate::{
    Result,
    install::Installer,
    location::InstallLocation,
    platform,
    scope::Scope,
    store::SkillStore,
    symlink,
    types::{InstallationRecord, Skill, SyncReport},
};

/// Maps a link name found in a skills directory to a stored skill.
#[async_trait]
pub trait SkillLookup: Send + Sync {
    async fn find(&self, store: &dyn SkillStore, entry_name: &str) -> Result<Option<Skill>>;
}

/// Tries the slug first, then the id prefixes older releases used for local
/// skills, then the name as a raw id.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacySkillLookup;

#[async_trait]
impl SkillLookup for LegacySkillLookup {
    async fn find(&self, store: &dyn SkillStore, entry_name: &str) -> Result<Option<Skill>> {
        if let Some(skill) = store.get_skill_by_slug(entry_name).await? {
            return Ok(Some(skill));
        }
        for id in [
            format!("local-{entry_name}"),
            format!("cwd-{entry_name}"),
            entry_name.to_string(),
        ] {
            if let Some(skill) = store.get_skill(&id).await? {
                return Ok(Some(skill));
            }
        }
        Ok(None)
    }
}

type LedgerKey = (String, Scope, PathBuf);

/// What one pass over the skills directories saw.
#[derive(Default)]
struct Scan {
    /// Records for live links, keyed by skill id.
    found: HashMap<String, Vec<InstallationRecord>>,
    scanned: HashSet<LedgerKey>,
    failed: HashSet<LedgerKey>,
    failed_scopes: HashSet<Scope>,
}

impl Scan {
    fn found_for(&self, skill_id: &str) -> &[InstallationRecord] {
        self.found.get(skill_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Locations whose directory could not be read: their records are kept
    /// as they are.
    fn is_failed(&self, location: &InstallLocation) -> bool {
        self.failed_scopes.contains(&location.scope) || self.failed.contains(&location.ledger_key())
    }

    fn was_scanned(&self, location: &InstallLocation) -> bool {
        self.scanned.contains(&location.ledger_key())
    }
}

impl Installer {
    /// Make the ledger and `is_installed` flags agree with the filesystem.
    pub async fn sync_install_state(&self) -> Result<SyncReport> {
        let skills = self.store.get_all_skills().await?;
        let mut report = SyncReport::default();
        let scan = self.scan_links(&mut report).await;

        for skill in &skills {
            if let Err(e) = self.reconcile_skill(skill, &scan, &mut report).await {
                warn!(skill = %skill.slug, error = %e, "skipping skill during reconciliation");
                report.units_skipped += 1;
            }
        }

        info!(
            added = report.records_added,
            removed = report.records_removed,
            flags = report.flags_updated,
            skipped = report.units_skipped,
            "reconciled installation ledger"
        );
        Ok(report)
    }

    async fn scan_links(&self, report: &mut SyncReport) -> Scan {
        let mut scan = Scan::default();
        let global = self.scopes.resolve(Scope::Global).ok();

        for scope in Scope::ALL {
            let base = match self.scopes.resolve(scope) {
                Ok(base) => base,
                Err(e) => {
                    warn!(%scope, error = %e, "skipping scope");
                    report.units_skipped += 1;
                    scan.failed_scopes.insert(scope);
                    continue;
                },
            };
            // Working in the home directory: project dirs are the global ones.
            if scope == Scope::Project && global.as_ref() == Some(&base) {
                debug!(base = %base.display(), "project scope is the global scope, not scanning twice");
                continue;
            }

            for info in platform::all().iter().filter(|p| p.supports_skills()) {
                let location = InstallLocation::new(info.id, scope, base.clone());
                match self.scan_location(&location, &mut scan.found).await {
                    Ok(()) => {
                        scan.scanned.insert(location.ledger_key());
                    },
                    Err(e) => {
                        warn!(%location, error = %e, "skipping skills directory");
                        report.units_skipped += 1;
                        scan.failed.insert(location.ledger_key());
                    },
                }
            }
        }
        scan
    }

    async fn scan_location(
        &self,
        location: &InstallLocation,
        found: &mut HashMap<String, Vec<InstallationRecord>>,
    ) -> Result<()> {
        let Some(dir) = location.skills_dir() else {
            return Ok(());
        };
        if !dir.is_dir() {
            return Ok(());
        }

        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !entry.file_type()?.is_symlink() {
                continue;
            }
            match self.lookup.find(self.store.as_ref(), &name).await? {
                Some(skill) => {
                    let record = InstallationRecord::new(skill.id.clone(), location, entry.path());
                    found.entry(skill.id).or_default().push(record);
                },
                None => debug!(%location, entry = %name, "link does not match a known skill"),
            }
        }
        Ok(())
    }

    async fn reconcile_skill(&self, skill: &Skill, scan: &Scan, report: &mut SyncReport) -> Result<()> {
        let found = scan.found_for(&skill.id);
        let recorded = self.store.get_installations(&skill.id).await?;
        let recorded_keys: HashSet<_> = recorded.iter().map(InstallationRecord::ledger_key).collect();
        let found_keys: HashSet<_> = found.iter().map(InstallationRecord::ledger_key).collect();

        let mut added = HashSet::new();
        for record in found {
            let key = record.ledger_key();
            if recorded_keys.contains(&key) || !added.insert(key) {
                continue;
            }
            self.store.add_installation(record).await?;
            report.records_added += 1;
            debug!(skill = %skill.slug, location = %record.location(), "recorded untracked link");
        }

        let mut kept = false;
        for record in &recorded {
            if found_keys.contains(&record.ledger_key()) {
                continue;
            }
            let location = record.location();
            if scan.is_failed(&location) {
                debug!(skill = %skill.slug, %location, "keeping record for unreadable directory");
                kept = true;
                continue;
            }
            // Project links under other directories are invisible to this scan.
            if !scan.was_scanned(&location) && symlink::is_symlink(&record.symlink_path) {
                kept = true;
                continue;
            }
            self.store
                .remove_installation(&skill.id, &record.platform, record.scope, &record.base_path)
                .await?;
            report.records_removed += 1;
            debug!(skill = %skill.slug, %location, "dropped record for missing link");
        }

        let installed = !found.is_empty() || kept;
        if installed != skill.is_installed {
            self.store.set_installed(&skill.id, installed).await?;
            report.flags_updated += 1;
        }
        Ok(())
    }
}
