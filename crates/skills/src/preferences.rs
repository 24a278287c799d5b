//! User preferences consulted when a request leaves platforms or scopes open.

use {skillbridge_config::SkillbridgeConfig, tracing::warn};

use crate::scope::Scope;

/// Source of the user's configured platform set.
pub trait PlatformPreferences: Send + Sync {
    /// Configured platform ids, in the user's order. Empty when unset.
    fn platforms(&self) -> Vec<String>;

    /// Scopes used when a request names none.
    fn default_scopes(&self) -> Vec<Scope> {
        vec![Scope::Global]
    }
}

impl PlatformPreferences for SkillbridgeConfig {
    fn platforms(&self) -> Vec<String> {
        self.install.platforms.clone()
    }

    fn default_scopes(&self) -> Vec<Scope> {
        let scopes: Vec<Scope> = self
            .install
            .scopes
            .iter()
            .filter_map(|s| match s.parse::<Scope>() {
                Ok(scope) => Some(scope),
                Err(e) => {
                    warn!(scope = %s, %e, "ignoring configured scope");
                    None
                },
            })
            .collect();
        if scopes.is_empty() {
            vec![Scope::Global]
        } else {
            scopes
        }
    }
}

/// Fixed platform list, for tests and embedders without a config file.
#[derive(Debug, Clone, Default)]
pub struct StaticPreferences {
    platforms: Vec<String>,
}

impl StaticPreferences {
    pub fn new<I, S>(platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            platforms: platforms.into_iter().map(Into::into).collect(),
        }
    }
}

impl PlatformPreferences for StaticPreferences {
    fn platforms(&self) -> Vec<String> {
        self.platforms.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_exposes_configured_platforms() {
        let mut cfg = SkillbridgeConfig::default();
        assert!(cfg.platforms().is_empty());
        cfg.install.platforms = vec!["claude".into(), "cursor".into()];
        assert_eq!(cfg.platforms(), vec!["claude", "cursor"]);
    }

    #[test]
    fn config_scopes_skip_invalid_and_default_to_global() {
        let mut cfg = SkillbridgeConfig::default();
        assert_eq!(cfg.default_scopes(), vec![Scope::Global]);

        cfg.install.scopes = vec!["project".into(), "bogus".into()];
        assert_eq!(cfg.default_scopes(), vec![Scope::Project]);

        cfg.install.scopes = vec!["bogus".into()];
        assert_eq!(cfg.default_scopes(), vec![Scope::Global]);
    }

    #[test]
    fn static_preferences_default_scope_is_global() {
        let prefs = StaticPreferences::new(["codex"]);
        assert_eq!(prefs.platforms(), vec!["codex"]);
        assert_eq!(prefs.default_scopes(), vec![Scope::Global]);
    }
}
