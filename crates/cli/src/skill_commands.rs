use std::sync::Arc;

use {
    anyhow::Result,
    skillbridge_config::SkillbridgeConfig,
    skillbridge_skills::{
        InstallOptions, InstallService, Installer, Scope, ScopeResolver, detect, platform,
        store_sqlite::SqliteSkillStore,
        types::{InstallReport, OutcomeStatus, SyncReport},
    },
    tracing::debug,
};

/// Open the ledger and wire an install service from `config`.
pub async fn open_service(config: &SkillbridgeConfig) -> Result<InstallService> {
    let database_url = config.storage.database_url_or_default();
    std::fs::create_dir_all(skillbridge_config::data_dir())?;
    debug!(%database_url, "opening skills ledger");

    let store = Arc::new(SqliteSkillStore::new(&database_url).await?);
    let installer = Installer::new(
        store,
        Arc::new(config.clone()),
        config.storage.repositories_dir_or_default(),
    )
    .with_backup_existing(config.install.backup_existing);
    Ok(InstallService::new(Arc::new(installer)))
}

pub async fn install(
    service: &InstallService,
    slugs: Vec<String>,
    options: InstallOptions,
) -> Result<()> {
    if let [slug] = slugs.as_slice() {
        let report = service.install(slug, &options).await?;
        print_report(&report);
        return Ok(());
    }

    let mut failed = 0;
    for outcome in service.install_batch(&slugs, &options).await {
        match outcome.result {
            Ok(report) => print_report(&report),
            Err(e) => {
                failed += 1;
                eprintln!("{}: {e}", outcome.slug);
            },
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {} skill(s) failed to install", slugs.len());
    }
    Ok(())
}

fn print_report(report: &InstallReport) {
    for outcome in &report.outcomes {
        match &outcome.status {
            OutcomeStatus::Installed { symlink_path } => {
                println!("  {} {} -> {}", report.slug, outcome.location, symlink_path.display());
            },
            OutcomeStatus::Skipped => {
                println!("  {} {} skipped (no skills directory)", report.slug, outcome.location);
            },
            OutcomeStatus::Failed { reason } => {
                eprintln!("  {} {} failed: {reason}", report.slug, outcome.location);
            },
        }
    }
}

pub async fn uninstall(
    service: &InstallService,
    slug: &str,
    all: bool,
    options: InstallOptions,
) -> Result<()> {
    if all {
        service.uninstall_all(slug).await?;
        println!("Removed '{slug}' from every tool.");
    } else {
        service.uninstall(slug, &options).await?;
        println!("Uninstalled '{slug}'.");
    }
    Ok(())
}

pub async fn list(service: &InstallService, json: bool) -> Result<()> {
    let summary = service.installed_skills_summary().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    if summary.is_empty() {
        println!("No skills installed.");
        return Ok(());
    }
    for entry in &summary {
        let places: Vec<String> = entry
            .platforms
            .iter()
            .map(|(platform, scopes)| {
                let scopes: Vec<&str> = scopes.iter().map(|s| s.as_str()).collect();
                format!("{platform} ({})", scopes.join(", "))
            })
            .collect();
        println!("  {:<24} {}", entry.slug, places.join(", "));
    }
    Ok(())
}

pub async fn sync(service: &InstallService) -> Result<()> {
    let report = service.installer().sync_install_state().await?;
    print_sync(&report);
    Ok(())
}

fn print_sync(report: &SyncReport) {
    if report.is_clean() {
        println!("Installation ledger is up to date.");
        return;
    }
    println!(
        "Recorded {} link(s), dropped {} stale record(s), updated {} flag(s).",
        report.records_added, report.records_removed, report.flags_updated
    );
    if report.units_skipped > 0 {
        println!("{} unit(s) skipped; run with --log-level debug for details.", report.units_skipped);
    }
}

pub fn platforms() -> Result<()> {
    let home = ScopeResolver::from_env().resolve(Scope::Global)?;
    let detected = detect::detect_platforms(&home);

    for info in platform::all() {
        let found = detected
            .iter()
            .find(|d| d.id == info.id)
            .map_or("", |_| "detected");
        let dir = if info.supports_skills() {
            info.skills_dir
        } else {
            "(no skills directory)"
        };
        println!("  {:<12} {:<18} {:<22} {found}", info.id, info.name, dir);
    }
    Ok(())
}
