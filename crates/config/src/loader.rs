use std::{
    path::{Path, PathBuf},
    sync::RwLock,
};

use {
    skillbridge_common::{Error, Result},
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::SkillbridgeConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "skillbridge.toml",
    "skillbridge.yaml",
    "skillbridge.yml",
    "skillbridge.json",
];

static CONFIG_DIR_OVERRIDE: RwLock<Option<PathBuf>> = RwLock::new(None);
static DATA_DIR_OVERRIDE: RwLock<Option<PathBuf>> = RwLock::new(None);

/// Override the user-global config directory (e.g. from `--config-dir`).
pub fn set_config_dir(path: PathBuf) {
    *CONFIG_DIR_OVERRIDE.write().unwrap_or_else(|e| e.into_inner()) = Some(path);
}

pub fn clear_config_dir() {
    *CONFIG_DIR_OVERRIDE.write().unwrap_or_else(|e| e.into_inner()) = None;
}

/// Override the data directory (e.g. from `--data-dir`).
pub fn set_data_dir(path: PathBuf) {
    *DATA_DIR_OVERRIDE.write().unwrap_or_else(|e| e.into_inner()) = Some(path);
}

pub fn clear_data_dir() {
    *DATA_DIR_OVERRIDE.write().unwrap_or_else(|e| e.into_inner()) = None;
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<SkillbridgeConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::message(format!("failed to read {}: {e}", path.display())))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./skillbridge.{toml,yaml,yml,json}` (project-local)
/// 2. `<config_dir>/skillbridge.{toml,yaml,yml,json}` (user-global)
///
/// Returns `SkillbridgeConfig::default()` if no config file is found.
pub fn discover_and_load() -> SkillbridgeConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    SkillbridgeConfig::default()
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/skillbridge/`).
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = CONFIG_DIR_OVERRIDE
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
    {
        return Some(dir);
    }
    directories::ProjectDirs::from("", "", "skillbridge").map(|d| d.config_dir().to_path_buf())
}

/// Returns the data directory holding the ledger database and cloned repos.
///
/// Falls back to `./.skillbridge` when no home directory can be determined.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = DATA_DIR_OVERRIDE
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
    {
        return dir;
    }
    directories::ProjectDirs::from("", "", "skillbridge")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".skillbridge"))
}

/// Returns the path of an existing config file, or the default TOML path.
pub fn find_or_default_config_path() -> PathBuf {
    if let Some(path) = find_config_file() {
        return path;
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skillbridge.toml")
}

/// Serialize `config` to TOML and write it to the user-global config path.
///
/// Creates parent directories if needed. Returns the path written to.
pub fn save_config(config: &SkillbridgeConfig) -> Result<PathBuf> {
    let path = find_or_default_config_path();
    save_config_to(config, &path)?;
    Ok(path)
}

fn save_config_to(config: &SkillbridgeConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(config).map_err(|e| Error::parse("toml", e))?;
    std::fs::write(path, toml_str)?;
    debug!(path = %path.display(), "saved config");
    Ok(())
}

fn parse_config(raw: &str, path: &Path) -> Result<SkillbridgeConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse("toml", e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse("yaml", e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse("json", e)),
        _ => Err(Error::message(format!("unsupported config format: .{ext}"))),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_toml_config() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("skillbridge.toml");
        std::fs::write(
            &path,
            "[install]\nplatforms = [\"claude\", \"cursor\"]\nscopes = [\"project\"]\n",
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.install.platforms, vec!["claude", "cursor"]);
        assert_eq!(cfg.install.scopes, vec!["project"]);
    }

    #[test]
    fn loads_yaml_and_json_configs() {
        let tmp = tempfile::tempdir().unwrap();

        let yaml = tmp.path().join("skillbridge.yaml");
        std::fs::write(&yaml, "install:\n  platforms: [codex]\n").unwrap();
        assert_eq!(load_config(&yaml).unwrap().install.platforms, vec!["codex"]);

        let json = tmp.path().join("skillbridge.json");
        std::fs::write(&json, r#"{"sync": {"on_startup": false}}"#).unwrap();
        assert!(!load_config(&json).unwrap().sync.on_startup);
    }

    #[test]
    fn rejects_unknown_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("skillbridge.ini");
        std::fs::write(&path, "").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn malformed_toml_reports_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("skillbridge.toml");
        std::fs::write(&path, "[install\nplatforms = 3").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(Error::Parse { format: "toml", .. })
        ));
    }

    #[test]
    fn save_then_load_preserves_platforms() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("skillbridge.toml");
        let mut cfg = SkillbridgeConfig::default();
        cfg.install.platforms = vec!["windsurf".into()];

        save_config_to(&cfg, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.install.platforms, vec!["windsurf"]);
    }
}
