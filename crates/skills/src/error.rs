use std::{error::Error as StdError, path::PathBuf};

use skillbridge_common::FromMessage;

use crate::types::LocationFailure;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid skill: {reason}")]
    InvalidSkill { reason: &'static str },

    #[error("skill '{slug}' has no source to install from")]
    NoSource { slug: String },

    #[error("no install locations specified")]
    NoLocationsSpecified,

    #[error("skill source not found at {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("symlink operation failed")]
    SymlinkFailed,

    #[error("{} already exists and is not a symlink", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("{} is not a symlink", path.display())]
    NotASymlink { path: PathBuf },

    #[error("backup already exists at {}", path.display())]
    BackupExists { path: PathBuf },

    #[error("invalid scope '{scope}': expected 'global' or 'project'")]
    InvalidScope { scope: String },

    #[error("skill not found: {key}")]
    SkillNotFound { key: String },

    #[error("no tools selected: configure at least one supported platform")]
    NoToolsSelected,

    #[error("{}", describe_failures(failures))]
    LocationsFailed { failures: Vec<LocationFailure> },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{message}")]
    Message { message: String },

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn skill_not_found(key: impl Into<String>) -> Self {
        Self::SkillNotFound { key: key.into() }
    }

    #[must_use]
    pub fn invalid_scope(scope: impl Into<String>) -> Self {
        Self::InvalidScope {
            scope: scope.into(),
        }
    }

    #[must_use]
    pub fn external<E>(context: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Per-location failures carried by this error, if any.
    pub fn failures(&self) -> &[LocationFailure] {
        match self {
            Self::LocationsFailed { failures } => failures,
            _ => &[],
        }
    }
}

fn describe_failures(failures: &[LocationFailure]) -> String {
    let details: Vec<String> = failures
        .iter()
        .map(|f| format!("{}: {}", f.location, f.reason))
        .collect();
    format!(
        "failed at {} location(s): {}",
        failures.len(),
        details.join("; ")
    )
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

skillbridge_common::impl_context!();

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{location::InstallLocation, scope::Scope},
    };

    #[test]
    fn locations_failed_lists_each_location() {
        let err = Error::LocationsFailed {
            failures: vec![
                LocationFailure {
                    location: InstallLocation::new("claude", Scope::Global, "/home/u"),
                    reason: "permission denied".into(),
                },
                LocationFailure {
                    location: InstallLocation::new("cursor", Scope::Project, "/work"),
                    reason: "disk full".into(),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "failed at 2 location(s): claude/global: permission denied; cursor/project: disk full"
        );
        assert_eq!(err.failures().len(), 2);
    }

    #[test]
    fn other_errors_carry_no_failures() {
        assert!(Error::NoLocationsSpecified.failures().is_empty());
    }
}
