//! Skill installation and reconciliation.
//!
//! Skills live in cloned repositories or local directories and are exposed
//! to external tools by symlinking them into each tool's skills directory.
//! Every link is recorded in an installation ledger so it can be listed,
//! removed, and reconciled against the filesystem.

pub mod detect;
pub mod error;
pub mod install;
pub mod location;
pub mod platform;
pub mod preferences;
pub mod reconcile;
pub mod scope;
pub mod service;
pub mod store;
pub mod store_memory;
pub mod store_sqlite;
pub mod symlink;
pub mod types;

pub use {
    error::{Error, Result},
    install::Installer,
    location::InstallLocation,
    scope::{Scope, ScopeResolver},
    service::{InstallOptions, InstallService},
};

/// Run database migrations for the skills crate.
///
/// This creates the `skill_sources`, `skills`, and `skill_installations`
/// tables. Should be called at startup when using
/// [`store_sqlite::SqliteSkillStore`].
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(pool)
        .await?;
    Ok(())
}
