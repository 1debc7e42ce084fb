//! Error types and handling for procdump.
//!
//! This module defines the crate-wide error type. Every variant maps to one
//! process exit status through [`Error::exit_code`].

use thiserror::Error;

use super::privilege::PrivilegeError;
use crate::domains::dump::{DumpError, exit};

/// A specialized Result type for procdump operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for procdump.
#[derive(Debug, Error)]
pub enum Error {
    /// Error from a dump request (usage, policy, or reading).
    #[error(transparent)]
    Dump(#[from] DumpError),

    /// Failure while capturing or switching privileges at startup.
    #[error(transparent)]
    Privilege(#[from] PrivilegeError),

    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors on the output stream outside of a dump.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a new configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// The process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Dump(err) => err.exit_code(),
            Self::Privilege(_) => exit::PRIVILEGE,
            Self::Config(_) => exit::CONFIG,
            Self::Io(_) | Self::Json(_) => exit::IO,
        }
    }
}
