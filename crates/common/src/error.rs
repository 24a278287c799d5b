use thiserror::Error;

/// Error shared by crates that have no domain-specific failure modes of their
/// own (configuration loading, path helpers).
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to parse {format}: {source}")]
    Parse {
        format: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    #[must_use]
    pub fn parse(
        format: &'static str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Parse {
            format,
            source: Box::new(source),
        }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can carry a free-form message.
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;
}

/// Adds a crate-local `Context` extension trait for `Result` and `Option`
/// that turns failures into the crate's `Error` via [`FromMessage`]. Expects
/// `Error` and `Result<T>` to be in scope where it is invoked.
#[macro_export]
macro_rules! impl_context {
    () => {
        pub trait Context<T>: Sized {
            /// Prefix a failure with `context`.
            fn context(self, context: impl Into<String>) -> Result<T> {
                self.with_context(|| context)
            }

            /// Like `context`, building the text only on failure.
            fn with_context<C: Into<String>, F: FnOnce() -> C>(self, f: F) -> Result<T>;
        }

        impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
            fn with_context<C: Into<String>, F: FnOnce() -> C>(self, f: F) -> Result<T> {
                self.map_err(|source| {
                    let prefix: String = f().into();
                    <Error as $crate::FromMessage>::from_message(format!("{prefix}: {source}"))
                })
            }
        }

        impl<T> Context<T> for Option<T> {
            fn with_context<C: Into<String>, F: FnOnce() -> C>(self, f: F) -> Result<T> {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(f().into()))
            }
        }
    };
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    mod local {
        pub use crate::error::{Error, Result};

        crate::impl_context!();
    }

    use local::Context;

    #[test]
    fn context_prefixes_result_errors() {
        let res: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::other("disk on fire"));
        let err = res.context("reading ledger").unwrap_err();
        assert_eq!(err.to_string(), "reading ledger: disk on fire");
    }

    #[test]
    fn context_turns_none_into_message() {
        let err = None::<u8>
            .with_context(|| format!("missing {}", "slug"))
            .unwrap_err();
        assert!(matches!(err, Error::Message(ref m) if m == "missing slug"));
    }

    #[test]
    fn parse_error_names_format() {
        let err = Error::parse("toml", std::io::Error::other("bad key"));
        assert_eq!(err.to_string(), "failed to parse toml: bad key");
    }
}
