//! SQLite-backed skill store using sqlx.

use std::path::{Path, PathBuf};

use {
    async_trait::async_trait,
    sqlx::{SqlitePool, sqlite::SqlitePoolOptions},
};

use crate::{
    Error, Result,
    error::Context,
    scope::Scope,
    store::SkillStore,
    types::{InstallationRecord, Skill, Source},
};

/// SQLite persistence for skills, sources, and installation records.
pub struct SqliteSkillStore {
    pool: SqlitePool,
}

impl SqliteSkillStore {
    /// Create a store with its own connection pool and run migrations.
    ///
    /// For a shared pool, call [`crate::run_migrations`] and use
    /// [`SqliteSkillStore::with_pool`].
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .with_context(|| format!("failed to connect to {database_url}"))?;

        crate::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a store using an existing pool (migrations must already be run).
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SkillStore for SqliteSkillStore {
    async fn get_skill(&self, id: &str) -> Result<Option<Skill>> {
        let row = sqlx::query_as::<_, SkillRow>("SELECT * FROM skills WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn get_skill_by_slug(&self, slug: &str) -> Result<Option<Skill>> {
        let row = sqlx::query_as::<_, SkillRow>("SELECT * FROM skills WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn get_all_skills(&self) -> Result<Vec<Skill>> {
        let rows = sqlx::query_as::<_, SkillRow>("SELECT * FROM skills ORDER BY slug")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn upsert_skill(&self, skill: &Skill) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO skills (id, slug, name, description, file_path, is_local, source_id, is_installed)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                 slug = excluded.slug,
                 name = excluded.name,
                 description = excluded.description,
                 file_path = excluded.file_path,
                 is_local = excluded.is_local,
                 source_id = excluded.source_id,
                 is_installed = excluded.is_installed"#,
        )
        .bind(&skill.id)
        .bind(&skill.slug)
        .bind(&skill.name)
        .bind(&skill.description)
        .bind(&skill.file_path)
        .bind(skill.is_local as i32)
        .bind(&skill.source_id)
        .bind(skill.is_installed as i32)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_source(&self, id: &str) -> Result<Option<Source>> {
        let row = sqlx::query_as::<_, SourceRow>("SELECT * FROM skill_sources WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn upsert_source(&self, source: &Source) -> Result<()> {
        sqlx::query(
            "INSERT INTO skill_sources (id, owner, repo) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET owner = excluded.owner, repo = excluded.repo",
        )
        .bind(&source.id)
        .bind(&source.owner)
        .bind(&source.repo)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_installed(&self, skill_id: &str, installed: bool) -> Result<()> {
        let result = sqlx::query("UPDATE skills SET is_installed = ? WHERE id = ?")
            .bind(installed as i32)
            .bind(skill_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::skill_not_found(skill_id));
        }
        Ok(())
    }

    async fn add_installation(&self, record: &InstallationRecord) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO skill_installations (skill_id, platform, scope, base_path, symlink_path, installed_at)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT(skill_id, platform, scope, base_path) DO UPDATE SET
                 symlink_path = excluded.symlink_path,
                 installed_at = excluded.installed_at"#,
        )
        .bind(&record.skill_id)
        .bind(&record.platform)
        .bind(record.scope.as_str())
        .bind(record.base_path.to_string_lossy().as_ref())
        .bind(record.symlink_path.to_string_lossy().as_ref())
        .bind(record.installed_at_ms as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_installation(
        &self,
        skill_id: &str,
        platform: &str,
        scope: Scope,
        base_path: &Path,
    ) -> Result<()> {
        sqlx::query(
            "DELETE FROM skill_installations
             WHERE skill_id = ? AND platform = ? AND scope = ? AND base_path = ?",
        )
        .bind(skill_id)
        .bind(platform)
        .bind(scope.as_str())
        .bind(base_path.to_string_lossy().as_ref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_all_installations(&self, skill_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM skill_installations WHERE skill_id = ?")
            .bind(skill_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_installations(&self, skill_id: &str) -> Result<Vec<InstallationRecord>> {
        let rows = sqlx::query_as::<_, InstallationRow>(
            "SELECT * FROM skill_installations WHERE skill_id = ? ORDER BY platform, scope",
        )
        .bind(skill_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(InstallationRecord::try_from).collect()
    }

    async fn get_all_installations(&self) -> Result<Vec<InstallationRecord>> {
        let rows = sqlx::query_as::<_, InstallationRow>(
            "SELECT * FROM skill_installations ORDER BY skill_id, platform, scope",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(InstallationRecord::try_from).collect()
    }

    async fn has_installations(&self, skill_id: &str) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM skill_installations WHERE skill_id = ?")
                .bind(skill_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }
}

// ── Row types ────────────────────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct SkillRow {
    id: String,
    slug: String,
    name: String,
    description: String,
    file_path: String,
    is_local: i32,
    source_id: Option<String>,
    is_installed: i32,
}

impl From<SkillRow> for Skill {
    fn from(r: SkillRow) -> Self {
        Self {
            id: r.id,
            slug: r.slug,
            name: r.name,
            description: r.description,
            file_path: r.file_path,
            is_local: r.is_local != 0,
            source_id: r.source_id,
            is_installed: r.is_installed != 0,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SourceRow {
    id: String,
    owner: String,
    repo: String,
}

impl From<SourceRow> for Source {
    fn from(r: SourceRow) -> Self {
        Self {
            id: r.id,
            owner: r.owner,
            repo: r.repo,
        }
    }
}

#[derive(sqlx::FromRow)]
struct InstallationRow {
    skill_id: String,
    platform: String,
    scope: String,
    base_path: String,
    symlink_path: String,
    installed_at: i64,
}

impl TryFrom<InstallationRow> for InstallationRecord {
    type Error = Error;

    fn try_from(r: InstallationRow) -> Result<Self> {
        Ok(Self {
            skill_id: r.skill_id,
            platform: r.platform,
            scope: r.scope.parse()?,
            base_path: PathBuf::from(r.base_path),
            symlink_path: PathBuf::from(r.symlink_path),
            installed_at_ms: r.installed_at as u64,
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::location::InstallLocation};

    async fn store() -> SqliteSkillStore {
        // A single connection so every query sees the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::run_migrations(&pool).await.unwrap();
        SqliteSkillStore::with_pool(pool)
    }

    fn skill(id: &str, slug: &str) -> Skill {
        Skill {
            id: id.into(),
            slug: slug.into(),
            name: "Teach".into(),
            description: "teaching aid".into(),
            file_path: "skills/teach/SKILL.md".into(),
            is_local: false,
            source_id: Some("src-1".into()),
            is_installed: false,
        }
    }

    #[tokio::test]
    async fn skill_and_source_crud() {
        let store = store().await;
        store
            .upsert_source(&Source {
                id: "src-1".into(),
                owner: "acme".into(),
                repo: "skills".into(),
            })
            .await
            .unwrap();
        store.upsert_skill(&skill("s1", "teach")).await.unwrap();

        let found = store.get_skill_by_slug("teach").await.unwrap().unwrap();
        assert_eq!(found, skill("s1", "teach"));
        assert_eq!(store.get_source("src-1").await.unwrap().unwrap().owner, "acme");
        assert!(store.get_skill("nope").await.unwrap().is_none());

        store.set_installed("s1", true).await.unwrap();
        assert!(store.get_skill("s1").await.unwrap().unwrap().is_installed);
        assert!(matches!(
            store.set_installed("nope", true).await,
            Err(Error::SkillNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn installation_ledger_roundtrip() {
        let store = store().await;
        store.upsert_skill(&skill("s1", "teach")).await.unwrap();

        let global = InstallLocation::new("claude", Scope::Global, "/home/u");
        let project = InstallLocation::new("cursor", Scope::Project, "/work");
        store
            .add_installation(&InstallationRecord::new(
                "s1",
                &global,
                PathBuf::from("/home/u/.claude/skills/teach"),
            ))
            .await
            .unwrap();
        store
            .add_installation(&InstallationRecord::new(
                "s1",
                &project,
                PathBuf::from("/work/.cursor/skills/teach"),
            ))
            .await
            .unwrap();
        // Same key again updates in place.
        store
            .add_installation(&InstallationRecord::new(
                "s1",
                &global,
                PathBuf::from("/elsewhere"),
            ))
            .await
            .unwrap();

        let records = store.get_installations("s1").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].platform, "claude");
        assert_eq!(records[0].scope, Scope::Global);
        assert_eq!(records[0].symlink_path, PathBuf::from("/elsewhere"));
        assert_eq!(store.get_all_installations().await.unwrap().len(), 2);
        assert!(store.has_installations("s1").await.unwrap());

        store
            .remove_installation("s1", "cursor", Scope::Project, Path::new("/work"))
            .await
            .unwrap();
        assert_eq!(store.get_installations("s1").await.unwrap().len(), 1);

        store.remove_all_installations("s1").await.unwrap();
        assert!(!store.has_installations("s1").await.unwrap());
    }

    #[tokio::test]
    async fn get_all_skills_sorted_by_slug() {
        let store = store().await;
        store.upsert_skill(&skill("b", "zeta")).await.unwrap();
        store.upsert_skill(&skill("a", "alpha")).await.unwrap();
        let slugs: Vec<_> = store
            .get_all_skills()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.slug)
            .collect();
        assert_eq!(slugs, vec!["alpha", "zeta"]);
    }
}
