//! Slug-level install operations for the CLI and other frontends.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use {
    serde::Serialize,
    tracing::{debug, warn},
};

use crate::{
    Error, Result,
    install::Installer,
    location::InstallLocation,
    platform::{self, DEFAULT_PLATFORM},
    scope::Scope,
    store::SkillStore,
    types::{InstallReport, Skill},
};

/// Where to install. Empty lists fall back to the user's preferences.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    pub platforms: Vec<String>,
    pub scopes: Vec<Scope>,
}

impl InstallOptions {
    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty() && self.scopes.is_empty()
    }
}

/// Result of one slug in a batch install.
#[derive(Debug)]
pub struct BatchOutcome {
    pub slug: String,
    pub result: Result<InstallReport>,
}

/// A skill with at least one installation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledSkillSummary {
    pub skill_id: String,
    pub slug: String,
    pub name: String,
    /// Platform id to the scopes it is installed at.
    pub platforms: BTreeMap<String, Vec<Scope>>,
}

pub struct InstallService {
    installer: Arc<Installer>,
}

impl InstallService {
    pub fn new(installer: Arc<Installer>) -> Self {
        Self { installer }
    }

    pub fn installer(&self) -> &Arc<Installer> {
        &self.installer
    }

    async fn skill(&self, slug: &str) -> Result<Skill> {
        self.installer
            .store()
            .get_skill_by_slug(slug)
            .await?
            .ok_or_else(|| Error::skill_not_found(slug))
    }

    /// Cross product of the requested platforms and scopes. Unknown platform
    /// names and platforms without a skills directory are dropped; nothing
    /// left over is [`Error::NoToolsSelected`].
    pub fn build_locations(&self, options: &InstallOptions) -> Result<Vec<InstallLocation>> {
        let preferences = self.installer.preferences();
        let mut platforms = if options.platforms.is_empty() {
            preferences.platforms()
        } else {
            options.platforms.clone()
        };
        if platforms.is_empty() {
            platforms.push(DEFAULT_PLATFORM.to_string());
        }
        let scopes = if options.scopes.is_empty() {
            preferences.default_scopes()
        } else {
            options.scopes.clone()
        };

        let mut locations = Vec::new();
        for name in &platforms {
            let Some(id) = platform::parse_platform(name) else {
                debug!(platform = %name, "ignoring unknown platform");
                continue;
            };
            if !platform::info(id).is_some_and(|p| p.supports_skills()) {
                debug!(platform = id, "platform has no skills directory");
                continue;
            }
            for &scope in &scopes {
                if let Some(location) = self.installer.resolve_location(id, scope)?
                    && !locations.contains(&location)
                {
                    locations.push(location);
                }
            }
        }

        if locations.is_empty() {
            return Err(Error::NoToolsSelected);
        }
        Ok(locations)
    }

    pub async fn install(&self, slug: &str, options: &InstallOptions) -> Result<InstallReport> {
        let skill = self.skill(slug).await?;
        let locations = self.build_locations(options)?;

        if skill.is_local {
            return self
                .installer
                .install_local_skill_to(&skill, &Installer::local_source_path(&skill), &locations)
                .await;
        }

        let no_source = || Error::NoSource {
            slug: skill.slug.clone(),
        };
        let source_id = skill.source_id.as_deref().ok_or_else(no_source)?;
        let source = self
            .installer
            .store()
            .get_source(source_id)
            .await?
            .ok_or_else(no_source)?;
        self.installer
            .install_to(&skill, Some(&source), &locations)
            .await
    }

    /// Install each slug in turn. One slug failing does not stop the rest.
    pub async fn install_batch(&self, slugs: &[String], options: &InstallOptions) -> Vec<BatchOutcome> {
        let mut outcomes = Vec::with_capacity(slugs.len());
        for slug in slugs {
            let result = self.install(slug, options).await;
            if let Err(e) = &result {
                warn!(%slug, error = %e, "batch install failed for skill");
            }
            outcomes.push(BatchOutcome {
                slug: slug.clone(),
                result,
            });
        }
        outcomes
    }

    /// Uninstall from the locations `options` describes, or from everywhere
    /// recorded when it is empty.
    pub async fn uninstall(&self, slug: &str, options: &InstallOptions) -> Result<()> {
        let skill = self.skill(slug).await?;
        if options.is_empty() {
            return self.installer.uninstall(&skill).await;
        }

        let locations = if options.platforms.is_empty() {
            // Only scopes given: every recorded platform at those scopes.
            self.installer
                .get_install_locations(&skill.id)
                .await?
                .into_iter()
                .filter(|l| options.scopes.contains(&l.scope))
                .collect()
        } else {
            self.build_locations(options)?
        };
        if locations.is_empty() {
            return Ok(());
        }
        self.installer.uninstall_from(&skill, &locations).await
    }

    pub async fn uninstall_all(&self, slug: &str) -> Result<()> {
        let skill = self.skill(slug).await?;
        self.installer.uninstall_all(&skill).await
    }

    /// Every skill with installation records, sorted by slug.
    pub async fn installed_skills_summary(&self) -> Result<Vec<InstalledSkillSummary>> {
        let store = self.installer.store();
        let mut grouped: BTreeMap<String, BTreeMap<String, BTreeSet<Scope>>> = BTreeMap::new();
        for record in store.get_all_installations().await? {
            grouped
                .entry(record.skill_id)
                .or_default()
                .entry(record.platform)
                .or_default()
                .insert(record.scope);
        }

        let mut summaries = Vec::with_capacity(grouped.len());
        for (skill_id, platforms) in grouped {
            let (slug, name) = match store.get_skill(&skill_id).await? {
                Some(skill) => (skill.slug, skill.name),
                None => (skill_id.clone(), String::new()),
            };
            summaries.push(InstalledSkillSummary {
                skill_id,
                slug,
                name,
                platforms: platforms
                    .into_iter()
                    .map(|(platform, scopes)| (platform, scopes.into_iter().collect()))
                    .collect(),
            });
        }
        summaries.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(summaries)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(all(test, unix))]
mod tests {
    use {
        super::*,
        crate::{
            preferences::StaticPreferences,
            scope::ScopeResolver,
            store_memory::InMemorySkillStore,
            symlink,
            types::Source,
        },
        std::{fs, path::PathBuf},
    };

    struct Fixture {
        _tmp: tempfile::TempDir,
        home: PathBuf,
        cwd: PathBuf,
        store: Arc<InMemorySkillStore>,
        service: InstallService,
    }

    async fn fixture(platforms: &[&str]) -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let home = tmp.path().join("home");
        let cwd = tmp.path().join("work");
        let repos = tmp.path().join("repos");
        fs::create_dir_all(&home).unwrap();
        fs::create_dir_all(&cwd).unwrap();

        let store = Arc::new(InMemorySkillStore::new());
        store
            .upsert_source(&Source {
                id: "src".into(),
                owner: "acme".into(),
                repo: "skills".into(),
            })
            .await
            .unwrap();
        for slug in ["teach", "review"] {
            fs::create_dir_all(repos.join("acme/skills").join(slug)).unwrap();
            store
                .upsert_skill(&Skill {
                    id: format!("id-{slug}"),
                    slug: slug.into(),
                    name: slug.to_uppercase(),
                    description: String::new(),
                    file_path: format!("{slug}/SKILL.md"),
                    is_local: false,
                    source_id: Some("src".into()),
                    is_installed: false,
                })
                .await
                .unwrap();
        }
        store
            .upsert_skill(&Skill {
                id: "orphan".into(),
                slug: "orphan".into(),
                name: String::new(),
                description: String::new(),
                file_path: "orphan/SKILL.md".into(),
                is_local: false,
                source_id: None,
                is_installed: false,
            })
            .await
            .unwrap();

        let installer = Installer::new(
            store.clone(),
            Arc::new(StaticPreferences::new(platforms.iter().copied())),
            repos,
        )
        .with_scope_resolver(ScopeResolver::fixed(&home, &cwd));

        Fixture {
            _tmp: tmp,
            home,
            cwd,
            store,
            service: InstallService::new(Arc::new(installer)),
        }
    }

    fn options(platforms: &[&str], scopes: &[Scope]) -> InstallOptions {
        InstallOptions {
            platforms: platforms.iter().map(|p| p.to_string()).collect(),
            scopes: scopes.to_vec(),
        }
    }

    #[tokio::test]
    async fn install_crosses_platforms_and_scopes() {
        let f = fixture(&[]).await;
        let report = f
            .service
            .install(
                "teach",
                &options(&["Claude", "cursor"], &[Scope::Global, Scope::Project]),
            )
            .await
            .unwrap();
        assert_eq!(report.installed().count(), 4);
        assert!(symlink::is_symlink(&f.home.join(".claude/skills/teach")));
        assert!(symlink::is_symlink(&f.cwd.join(".cursor/skills/teach")));
    }

    #[tokio::test]
    async fn empty_options_use_preferences() {
        let f = fixture(&["codex"]).await;
        f.service
            .install("teach", &InstallOptions::default())
            .await
            .unwrap();
        assert!(symlink::is_symlink(&f.home.join(".codex/skills/teach")));
    }

    #[tokio::test]
    async fn unknown_or_unsupported_platforms_only_is_no_tools_selected() {
        let f = fixture(&[]).await;
        let err = f
            .service
            .install("teach", &options(&["nope", "aider"], &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoToolsSelected));
    }

    #[tokio::test]
    async fn unknown_slug_and_missing_source() {
        let f = fixture(&[]).await;
        assert!(matches!(
            f.service.install("ghost", &InstallOptions::default()).await,
            Err(Error::SkillNotFound { .. })
        ));
        assert!(matches!(
            f.service.install("orphan", &InstallOptions::default()).await,
            Err(Error::NoSource { .. })
        ));
    }

    #[tokio::test]
    async fn batch_continues_after_failure() {
        let f = fixture(&["claude"]).await;
        let slugs = vec!["ghost".to_string(), "teach".to_string(), "review".to_string()];
        let outcomes = f
            .service
            .install_batch(&slugs, &InstallOptions::default())
            .await;
        let ok: Vec<_> = outcomes
            .iter()
            .filter(|o| o.result.is_ok())
            .map(|o| o.slug.as_str())
            .collect();
        assert_eq!(ok, vec!["teach", "review"]);
    }

    #[tokio::test]
    async fn uninstall_targets_requested_locations() {
        let f = fixture(&[]).await;
        let both = options(&["claude", "cursor"], &[Scope::Global, Scope::Project]);
        f.service.install("teach", &both).await.unwrap();

        // Scope only: every recorded platform at project scope.
        f.service
            .uninstall("teach", &options(&[], &[Scope::Project]))
            .await
            .unwrap();
        assert!(!symlink::entry_exists(&f.cwd.join(".claude/skills/teach")));
        assert!(!symlink::entry_exists(&f.cwd.join(".cursor/skills/teach")));

        f.service
            .uninstall("teach", &options(&["cursor"], &[Scope::Global]))
            .await
            .unwrap();
        assert!(!symlink::entry_exists(&f.home.join(".cursor/skills/teach")));
        assert!(symlink::is_symlink(&f.home.join(".claude/skills/teach")));

        f.service
            .uninstall("teach", &InstallOptions::default())
            .await
            .unwrap();
        assert!(!f.store.has_installations("id-teach").await.unwrap());
    }

    #[tokio::test]
    async fn summary_groups_by_skill_and_platform() {
        let f = fixture(&[]).await;
        f.service
            .install("teach", &options(&["claude"], &[Scope::Project, Scope::Global]))
            .await
            .unwrap();
        f.service
            .install("review", &options(&["cursor"], &[]))
            .await
            .unwrap();

        let summary = f.service.installed_skills_summary().await.unwrap();
        let slugs: Vec<_> = summary.iter().map(|s| s.slug.as_str()).collect();
        assert_eq!(slugs, vec!["review", "teach"]);
        assert_eq!(summary[1].name, "TEACH");
        assert_eq!(
            summary[1].platforms.get("claude"),
            Some(&vec![Scope::Global, Scope::Project])
        );

        f.service.uninstall_all("teach").await.unwrap();
        assert_eq!(f.service.installed_skills_summary().await.unwrap().len(), 1);
    }
}
