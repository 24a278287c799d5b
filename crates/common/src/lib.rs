//! Shared error definitions and helpers used across all skillbridge crates.

pub mod error;

pub use error::{Error, FromMessage, Result};
