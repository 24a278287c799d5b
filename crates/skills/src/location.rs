//! Install locations and path resolution.

use std::{
    fmt,
    hash::{Hash, Hasher},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    platform,
    scope::{Scope, ScopeResolver},
};

/// A resolved (platform, scope, base path) triple.
///
/// The base path is captured when the location is resolved, so a location
/// stays valid after the working directory changes. Equality and hashing use
/// only platform and scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallLocation {
    pub platform: String,
    pub scope: Scope,
    pub base_path: PathBuf,
}

impl InstallLocation {
    pub fn new(platform: impl Into<String>, scope: Scope, base_path: impl Into<PathBuf>) -> Self {
        Self {
            platform: platform.into(),
            scope,
            base_path: base_path.into(),
        }
    }

    /// Resolve `platform` at `scope`. Returns `None` for unknown platforms.
    pub fn resolve(
        platform_id: &str,
        scope: Scope,
        scopes: &ScopeResolver,
    ) -> Result<Option<Self>> {
        if platform::info(platform_id).is_none() {
            return Ok(None);
        }
        let base = scopes.resolve(scope)?;
        Ok(Some(Self::new(platform_id, scope, base)))
    }

    /// The platform's skills directory under this location's base, or `None`
    /// when the platform has no skills directory.
    pub fn skills_dir(&self) -> Option<PathBuf> {
        skills_dir_under(&self.base_path, &self.platform)
    }

    /// Where the link for `slug` lives at this location.
    pub fn target_path(&self, slug: &str) -> Option<PathBuf> {
        self.skills_dir().map(|dir| dir.join(slug))
    }

    /// Ledger key: unlike equality, this includes the base path.
    pub(crate) fn ledger_key(&self) -> (String, Scope, PathBuf) {
        (self.platform.clone(), self.scope, self.base_path.clone())
    }
}

impl PartialEq for InstallLocation {
    fn eq(&self, other: &Self) -> bool {
        self.platform == other.platform && self.scope == other.scope
    }
}

impl Eq for InstallLocation {}

impl Hash for InstallLocation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.platform.hash(state);
        self.scope.hash(state);
    }
}

impl fmt::Display for InstallLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.platform, self.scope)
    }
}

fn skills_dir_under(base: &Path, platform_id: &str) -> Option<PathBuf> {
    platform::info(platform_id)
        .filter(|p| p.supports_skills())
        .map(|p| base.join(p.skills_dir))
}

/// Skills directory for `platform` at `scope`, or `None` when the platform is
/// unknown or has no skills directory.
pub fn skills_dir(
    platform_id: &str,
    scope: Scope,
    scopes: &ScopeResolver,
) -> Result<Option<PathBuf>> {
    if platform::info(platform_id).is_none() {
        return Ok(None);
    }
    Ok(skills_dir_under(&scopes.resolve(scope)?, platform_id))
}

/// Absolute link path for `slug` on `platform` at `scope`.
pub fn skill_path(
    platform_id: &str,
    scope: Scope,
    slug: &str,
    scopes: &ScopeResolver,
) -> Result<Option<PathBuf>> {
    Ok(skills_dir(platform_id, scope, scopes)?.map(|dir| dir.join(slug)))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::collections::HashSet};

    fn resolver() -> ScopeResolver {
        ScopeResolver::fixed("/home/u", "/work/repo")
    }

    #[test]
    fn skill_path_joins_base_subpath_and_slug() {
        let path = skill_path("claude", Scope::Global, "teach", &resolver()).unwrap();
        assert_eq!(path, Some(PathBuf::from("/home/u/.claude/skills/teach")));

        let path = skill_path("cursor", Scope::Project, "teach", &resolver()).unwrap();
        assert_eq!(path, Some(PathBuf::from("/work/repo/.cursor/skills/teach")));
    }

    #[test]
    fn skill_path_is_empty_without_skills_dir() {
        assert_eq!(
            skill_path("aider", Scope::Global, "teach", &resolver()).unwrap(),
            None
        );
        assert_eq!(
            skill_path("unknown", Scope::Global, "teach", &resolver()).unwrap(),
            None
        );
    }

    #[test]
    fn resolve_skips_unknown_platform() {
        assert!(
            InstallLocation::resolve("nope", Scope::Global, &resolver())
                .unwrap()
                .is_none()
        );
        let loc = InstallLocation::resolve("codex", Scope::Project, &resolver())
            .unwrap()
            .unwrap();
        assert_eq!(loc.base_path, PathBuf::from("/work/repo"));
        assert_eq!(
            loc.target_path("x"),
            Some(PathBuf::from("/work/repo/.codex/skills/x"))
        );
    }

    #[test]
    fn equality_ignores_base_path() {
        let a = InstallLocation::new("claude", Scope::Project, "/a");
        let b = InstallLocation::new("claude", Scope::Project, "/b");
        assert_eq!(a, b);
        assert_ne!(a.ledger_key(), b.ledger_key());

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn display_is_platform_slash_scope() {
        let loc = InstallLocation::new("gemini", Scope::Global, "/h");
        assert_eq!(loc.to_string(), "gemini/global");
    }
}
