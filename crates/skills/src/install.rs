//! Multi-location install and uninstall.
//!
//! Each location is processed independently: one failing location never stops
//! its siblings. Links are created first and recorded second; the two steps
//! are not one transaction, so a crash between them leaves drift that
//! [`Installer::sync_install_state`] repairs.

use std::{
    cmp::Reverse,
    collections::HashSet,
    fs,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use tracing::{debug, info, warn};

use crate::{
    Error, Result,
    location::InstallLocation,
    platform::{self, DEFAULT_PLATFORM},
    preferences::PlatformPreferences,
    reconcile::{LegacySkillLookup, SkillLookup},
    scope::{Scope, ScopeResolver},
    store::SkillStore,
    symlink,
    types::{
        InstallReport, InstallationRecord, LocationFailure, LocationOutcome, OutcomeStatus, Skill,
        Source, collect_failures,
    },
};

/// Links skills into platform directories and keeps the ledger in step.
pub struct Installer {
    pub(crate) store: Arc<dyn SkillStore>,
    preferences: Arc<dyn PlatformPreferences>,
    pub(crate) scopes: ScopeResolver,
    repositories_dir: PathBuf,
    pub(crate) lookup: Arc<dyn SkillLookup>,
    backup_existing: bool,
}

/// A link this install made, with what it displaced so a rollback can put
/// that back.
struct Linked {
    record: InstallationRecord,
    previous_link: Option<PathBuf>,
    moved_aside: bool,
    record_existed: bool,
}

impl Linked {
    /// Put back whatever occupied the target before this install.
    fn restore_link(&self) -> Result<()> {
        let target = &self.record.symlink_path;
        match &self.previous_link {
            Some(previous) if symlink::verify(target, previous) => Ok(()),
            Some(previous) => symlink::create(previous, target, false),
            None if self.moved_aside => symlink::restore_backup(target),
            None => symlink::remove(target),
        }
    }
}

impl Installer {
    pub fn new(
        store: Arc<dyn SkillStore>,
        preferences: Arc<dyn PlatformPreferences>,
        repositories_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            preferences,
            scopes: ScopeResolver::from_env(),
            repositories_dir: repositories_dir.into(),
            lookup: Arc::new(LegacySkillLookup),
            backup_existing: false,
        }
    }

    pub fn with_scope_resolver(mut self, scopes: ScopeResolver) -> Self {
        self.scopes = scopes;
        self
    }

    /// Replace the strategy reconciliation uses to map link names to skills.
    pub fn with_lookup(mut self, lookup: Arc<dyn SkillLookup>) -> Self {
        self.lookup = lookup;
        self
    }

    /// Move regular files occupying a link target to `<target>.backup`
    /// instead of failing that location.
    pub fn with_backup_existing(mut self, backup_existing: bool) -> Self {
        self.backup_existing = backup_existing;
        self
    }

    pub fn store(&self) -> &Arc<dyn SkillStore> {
        &self.store
    }

    pub fn preferences(&self) -> &Arc<dyn PlatformPreferences> {
        &self.preferences
    }

    pub fn scopes(&self) -> &ScopeResolver {
        &self.scopes
    }

    pub fn repositories_dir(&self) -> &Path {
        &self.repositories_dir
    }

    pub fn resolve_location(&self, platform_id: &str, scope: Scope) -> Result<Option<InstallLocation>> {
        InstallLocation::resolve(platform_id, scope, &self.scopes)
    }

    /// The user's preferred platforms at global scope, or the default platform
    /// when none are configured.
    pub fn default_locations(&self) -> Result<Vec<InstallLocation>> {
        let mut platforms = self.preferences.platforms();
        if platforms.is_empty() {
            platforms.push(DEFAULT_PLATFORM.to_string());
        }

        let mut locations = Vec::with_capacity(platforms.len());
        for name in &platforms {
            let Some(id) = platform::parse_platform(name) else {
                debug!(platform = %name, "ignoring unknown configured platform");
                continue;
            };
            if let Some(location) = self.resolve_location(id, Scope::Global)?
                && !locations.contains(&location)
            {
                locations.push(location);
            }
        }
        Ok(locations)
    }

    /// On-disk directory a repository skill links to.
    pub fn repository_source_path(&self, skill: &Skill, source: &Source) -> PathBuf {
        source
            .repo_dir(&self.repositories_dir)
            .join(skill.content_dir())
    }

    /// Directory a local skill links to: its `file_path` when that is a
    /// directory, otherwise the directory containing it.
    pub fn local_source_path(skill: &Skill) -> PathBuf {
        let path = Path::new(&skill.file_path);
        if path.is_dir() {
            path.to_path_buf()
        } else {
            skill.content_dir()
        }
    }

    // ── Install ──────────────────────────────────────────────────────────────

    /// Install to the user's default locations.
    pub async fn install(&self, skill: &Skill, source: Option<&Source>) -> Result<InstallReport> {
        let locations = self.default_locations()?;
        if skill.is_local {
            self.install_local_skill_to(skill, &Self::local_source_path(skill), &locations)
                .await
        } else {
            self.install_to(skill, source, &locations).await
        }
    }

    /// Install a repository skill to `locations`.
    pub async fn install_to(
        &self,
        skill: &Skill,
        source: Option<&Source>,
        locations: &[InstallLocation],
    ) -> Result<InstallReport> {
        validate_skill(skill)?;
        let source = source.ok_or_else(|| Error::NoSource {
            slug: skill.slug.clone(),
        })?;
        if locations.is_empty() {
            return Err(Error::NoLocationsSpecified);
        }
        let source_path = self.repository_source_path(skill, source);
        self.link_all(skill, &source_path, locations).await
    }

    /// Install a locally authored skill whose content lives at `source_path`.
    pub async fn install_local_skill_to(
        &self,
        skill: &Skill,
        source_path: &Path,
        locations: &[InstallLocation],
    ) -> Result<InstallReport> {
        validate_skill(skill)?;
        if source_path.as_os_str().is_empty() {
            return Err(Error::NoSource {
                slug: skill.slug.clone(),
            });
        }
        if locations.is_empty() {
            return Err(Error::NoLocationsSpecified);
        }
        self.link_all(skill, source_path, locations).await
    }

    /// Uninstall everywhere recorded, then install to the default locations.
    pub async fn reinstall(&self, skill: &Skill, source: Option<&Source>) -> Result<InstallReport> {
        self.uninstall(skill).await?;
        self.install(skill, source).await
    }

    async fn link_all(
        &self,
        skill: &Skill,
        source_path: &Path,
        locations: &[InstallLocation],
    ) -> Result<InstallReport> {
        if !source_path.exists() {
            return Err(Error::SourceNotFound {
                path: source_path.to_path_buf(),
            });
        }

        let recorded: HashSet<_> = self
            .store
            .get_installations(&skill.id)
            .await?
            .iter()
            .map(InstallationRecord::ledger_key)
            .collect();

        let mut outcomes = Vec::with_capacity(locations.len());
        let mut created_dirs = Vec::new();
        let mut linked = Vec::new();

        for location in locations {
            let Some(target) = location.target_path(&skill.slug) else {
                debug!(skill = %skill.slug, %location, "platform has no skills directory, skipping");
                outcomes.push(LocationOutcome {
                    location: location.clone(),
                    status: OutcomeStatus::Skipped,
                });
                continue;
            };

            let status = match self
                .link_one(skill, source_path, location, &target, &mut created_dirs)
                .await
            {
                Ok(mut link) => {
                    info!(skill = %skill.slug, %location, link = %target.display(), "linked skill");
                    link.record_existed = recorded.contains(&link.record.ledger_key());
                    linked.push(link);
                    OutcomeStatus::Installed {
                        symlink_path: target,
                    }
                },
                Err(e) => {
                    warn!(skill = %skill.slug, %location, error = %e, "failed to link skill");
                    OutcomeStatus::Failed {
                        reason: e.to_string(),
                    }
                },
            };
            outcomes.push(LocationOutcome {
                location: location.clone(),
                status,
            });
        }

        if linked.is_empty() {
            remove_created_dirs(&created_dirs);
            let failures = collect_failures(&outcomes);
            return Err(if failures.is_empty() {
                Error::SymlinkFailed
            } else {
                Error::LocationsFailed { failures }
            });
        }

        // Commit point: a skill must never have links without being marked
        // installed.
        if let Err(e) = self.store.set_installed(&skill.id, true).await {
            warn!(skill = %skill.slug, error = %e, "failed to mark skill installed, rolling back");
            self.roll_back(&linked).await;
            remove_created_dirs(&created_dirs);
            if let Err(refresh) = self.refresh_installed_flag(&skill.id).await {
                warn!(skill = %skill.slug, error = %refresh, "could not refresh installed flag after rollback");
            }
            return Err(e);
        }

        Ok(InstallReport {
            skill_id: skill.id.clone(),
            slug: skill.slug.clone(),
            outcomes,
        })
    }

    async fn link_one(
        &self,
        skill: &Skill,
        source_path: &Path,
        location: &InstallLocation,
        target: &Path,
        created_dirs: &mut Vec<PathBuf>,
    ) -> Result<Linked> {
        if let Some(parent) = target.parent() {
            ensure_dir(parent, created_dirs)?;
        }
        clear_directory(target)?;
        let previous_link = symlink::read_link(target).ok();
        let moved_aside = previous_link.is_none() && symlink::entry_exists(target);
        symlink::create(source_path, target, self.backup_existing)?;

        let linked = Linked {
            record: InstallationRecord::new(skill.id.clone(), location, target.to_path_buf()),
            previous_link,
            moved_aside,
            record_existed: false,
        };
        if let Err(e) = self.store.add_installation(&linked.record).await {
            if let Err(undo) = linked.restore_link() {
                warn!(link = %target.display(), error = %undo, "failed to undo unrecorded link");
            }
            return Err(e);
        }
        Ok(linked)
    }

    /// Undo what `linked` changed. Links and records that were already in
    /// place before the install are left as they were.
    async fn roll_back(&self, linked: &[Linked]) {
        for link in linked {
            let record = &link.record;
            if let Err(e) = link.restore_link() {
                warn!(link = %record.symlink_path.display(), error = %e, "rollback could not restore link");
            }
            if link.record_existed {
                continue;
            }
            if let Err(e) = self
                .store
                .remove_installation(
                    &record.skill_id,
                    &record.platform,
                    record.scope,
                    &record.base_path,
                )
                .await
            {
                warn!(skill_id = %record.skill_id, platform = %record.platform, error = %e, "rollback could not remove record");
            }
        }
    }

    // ── Uninstall ────────────────────────────────────────────────────────────

    /// Uninstall from every recorded location. A skill with no records is left
    /// untouched.
    pub async fn uninstall(&self, skill: &Skill) -> Result<()> {
        validate_skill(skill)?;
        let records = self.store.get_installations(&skill.id).await?;
        if records.is_empty() {
            return Ok(());
        }
        let locations: Vec<InstallLocation> =
            records.iter().map(InstallationRecord::location).collect();
        self.uninstall_from(skill, &locations).await
    }

    /// Remove the skill's link and record at each of `locations`.
    pub async fn uninstall_from(&self, skill: &Skill, locations: &[InstallLocation]) -> Result<()> {
        validate_skill(skill)?;
        let mut failures = Vec::new();

        for location in locations {
            if let Some(target) = location.target_path(&skill.slug)
                && symlink::is_symlink(&target)
            {
                match symlink::remove(&target) {
                    Ok(()) => {
                        info!(skill = %skill.slug, %location, "removed skill link");
                    },
                    Err(e) => failures.push(LocationFailure {
                        location: location.clone(),
                        reason: e.to_string(),
                    }),
                }
            }

            if let Err(e) = self
                .store
                .remove_installation(
                    &skill.id,
                    &location.platform,
                    location.scope,
                    &location.base_path,
                )
                .await
            {
                failures.push(LocationFailure {
                    location: location.clone(),
                    reason: e.to_string(),
                });
            }
        }

        self.refresh_installed_flag(&skill.id).await?;

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::LocationsFailed { failures })
        }
    }

    /// Remove every recorded link and record, plus unrecorded links named
    /// after the slug in each platform's global directory. The skill always
    /// ends up marked as not installed.
    pub async fn uninstall_all(&self, skill: &Skill) -> Result<()> {
        validate_skill(skill)?;
        let mut failures = Vec::new();
        let mut store_error = None;

        match self.store.get_installations(&skill.id).await {
            Ok(records) => {
                for record in records {
                    if symlink::is_symlink(&record.symlink_path)
                        && let Err(e) = symlink::remove(&record.symlink_path)
                    {
                        failures.push(LocationFailure {
                            location: record.location(),
                            reason: e.to_string(),
                        });
                    }
                }
            },
            Err(e) => {
                warn!(skill = %skill.slug, error = %e, "could not list installations");
                store_error.get_or_insert(e);
            },
        }

        if let Err(e) = self.store.remove_all_installations(&skill.id).await {
            warn!(skill = %skill.slug, error = %e, "could not clear installations");
            store_error.get_or_insert(e);
        }

        // Links created before installations were recorded.
        match self.scopes.resolve(Scope::Global) {
            Ok(home) => {
                for info in platform::all() {
                    let location = InstallLocation::new(info.id, Scope::Global, home.clone());
                    let Some(target) = location.target_path(&skill.slug) else {
                        continue;
                    };
                    if !symlink::is_symlink(&target) {
                        continue;
                    }
                    match symlink::remove(&target) {
                        Ok(()) => debug!(skill = %skill.slug, %location, "removed untracked link"),
                        Err(e) => failures.push(LocationFailure {
                            location,
                            reason: e.to_string(),
                        }),
                    }
                }
            },
            Err(e) => warn!(error = %e, "skipping untracked link scan"),
        }

        if let Err(e) = self.store.set_installed(&skill.id, false).await {
            store_error.get_or_insert(e);
        }

        info!(skill = %skill.slug, failures = failures.len(), "uninstalled skill everywhere");

        match store_error {
            Some(e) => Err(e),
            None if failures.is_empty() => Ok(()),
            None => Err(Error::LocationsFailed { failures }),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    pub async fn is_installed(&self, skill_id: &str) -> Result<bool> {
        self.store.has_installations(skill_id).await
    }

    pub async fn get_install_locations(&self, skill_id: &str) -> Result<Vec<InstallLocation>> {
        Ok(self
            .store
            .get_installations(skill_id)
            .await?
            .iter()
            .map(InstallationRecord::location)
            .collect())
    }

    /// Set the stored flag from the ledger. Returns the new value.
    async fn refresh_installed_flag(&self, skill_id: &str) -> Result<bool> {
        let installed = self.store.has_installations(skill_id).await?;
        self.store.set_installed(skill_id, installed).await?;
        Ok(installed)
    }
}

/// Slugs become link names, so they must be a single normal path component.
fn validate_skill(skill: &Skill) -> Result<()> {
    if skill.id.trim().is_empty() {
        return Err(Error::InvalidSkill {
            reason: "empty id",
        });
    }
    if skill.slug.trim().is_empty() {
        return Err(Error::InvalidSkill {
            reason: "empty slug",
        });
    }
    let mut components = Path::new(&skill.slug).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(Error::InvalidSkill {
            reason: "slug must be a single path component",
        }),
    }
}

/// Create `dir` if needed, remembering each directory this call created.
fn ensure_dir(dir: &Path, created: &mut Vec<PathBuf>) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    let missing: Vec<PathBuf> = dir
        .ancestors()
        .take_while(|p| !p.as_os_str().is_empty() && !symlink::entry_exists(p))
        .map(Path::to_path_buf)
        .collect();
    fs::create_dir_all(dir)?;
    created.extend(missing);
    Ok(())
}

/// Remove directories created by a failed install, deepest first. Directories
/// that are no longer empty stay.
fn remove_created_dirs(created: &[PathBuf]) {
    let mut dirs = created.to_vec();
    dirs.sort_by_key(|d| Reverse(d.components().count()));
    dirs.dedup();
    for dir in dirs {
        if fs::remove_dir(&dir).is_ok() {
            debug!(dir = %dir.display(), "removed directory created by failed install");
        }
    }
}

/// A real directory at the link target is replaced by the link. Symlinks are
/// left for [`symlink::create`] to swap atomically.
fn clear_directory(target: &Path) -> Result<()> {
    match fs::symlink_metadata(target) {
        Ok(meta) if meta.is_dir() => {
            warn!(path = %target.display(), "replacing existing directory with skill link");
            Ok(fs::remove_dir_all(target)?)
        },
        _ => Ok(()),
    }
}
