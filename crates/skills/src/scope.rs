use std::{fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{Context, Error, Result};

/// Where a skill is installed: the user's home or the current project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Global,
    Project,
}

impl Scope {
    pub const ALL: [Scope; 2] = [Scope::Global, Scope::Project];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Project => "project",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(Self::Global),
            "project" => Ok(Self::Project),
            _ => Err(Error::invalid_scope(s)),
        }
    }
}

/// Maps a [`Scope`] to its base directory.
///
/// The default resolver reads the home directory and the process working
/// directory at call time; [`ScopeResolver::fixed`] pins both, which keeps
/// tests and embedders independent of the process environment.
#[derive(Debug, Clone, Default)]
pub struct ScopeResolver {
    home: Option<PathBuf>,
    cwd: Option<PathBuf>,
}

impl ScopeResolver {
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn fixed(home: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            home: Some(home.into()),
            cwd: Some(cwd.into()),
        }
    }

    pub fn resolve(&self, scope: Scope) -> Result<PathBuf> {
        match scope {
            Scope::Global => self.home_dir(),
            Scope::Project => match &self.cwd {
                Some(cwd) => Ok(cwd.clone()),
                None => Ok(std::env::current_dir()?),
            },
        }
    }

    pub fn home_dir(&self) -> Result<PathBuf> {
        if let Some(home) = &self.home {
            return Ok(home.clone());
        }
        directories::BaseDirs::new()
            .map(|d| d.home_dir().to_path_buf())
            .context("home directory could not be determined")
    }
}

/// Resolve a scope name (`global` or `project`) against the process
/// environment.
pub fn resolve_scope(scope: &str) -> Result<PathBuf> {
    ScopeResolver::from_env().resolve(scope.parse()?)
}
