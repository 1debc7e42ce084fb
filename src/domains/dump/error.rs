//! Dump-specific error types and exit statuses.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::privilege::PrivilegeError;
use crate::core::security::{DenyReason, TraversalKind};

/// Process exit statuses. Each failure class has its own code.
pub mod exit {
    pub const SUCCESS: u8 = 0;
    pub const USAGE: u8 = 2;
    pub const TRAVERSAL: u8 = 3;
    pub const EXACT_MATCH: u8 = 4;
    pub const SEGMENT_MATCH: u8 = 5;
    pub const NOT_FOUND: u8 = 6;
    pub const UNREADABLE: u8 = 7;
    pub const IO: u8 = 8;
    pub const PRIVILEGE: u8 = 9;
    pub const SYMLINK_ESCAPE: u8 = 10;
    pub const CONFIG: u8 = 11;
}

/// Errors that end a dump request.
#[derive(Debug, Error)]
pub enum DumpError {
    /// Wrong argument shape.
    #[error("usage: {0}")]
    Usage(String),

    /// The input tried to leave the trusted root.
    #[error("path '{}' rejected: {kind}", input.escape_debug())]
    Traversal { input: String, kind: TraversalKind },

    /// The last segment matched an exact-name exclusion rule.
    #[error(
        "path '{}' denied by exact-name rule '{}'",
        input.escape_debug(),
        rule.escape_debug()
    )]
    ExactMatch { input: String, rule: String },

    /// A segment matched a path-segment exclusion rule.
    #[error(
        "path '{}' denied by path-segment rule '{}'",
        input.escape_debug(),
        rule.escape_debug()
    )]
    SegmentMatch { input: String, rule: String },

    /// The target does not exist.
    #[error("no such file: '{}'", escaped(path))]
    NotFound { path: PathBuf },

    /// The target exists but could not be opened, even elevated.
    #[error("permission denied: '{}'", escaped(path))]
    PermissionDenied { path: PathBuf },

    /// The target opened but is a directory, so there is nothing to stream.
    #[error("is a directory: '{}'", escaped(path))]
    IsDirectory { path: PathBuf },

    /// The opened file resolves outside the trusted root.
    #[error(
        "'{}' resolves to '{}', outside the trusted root",
        escaped(path),
        escaped(target)
    )]
    SymlinkEscape { path: PathBuf, target: PathBuf },

    /// Reading the source or writing the output failed.
    #[error("I/O error on '{}': {source}", escaped(path))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Raising or lowering privileges failed.
    #[error(transparent)]
    Privilege(#[from] PrivilegeError),
}

impl DumpError {
    /// Create a new usage error.
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Convert a policy denial into an error for `input`.
    pub fn denied(input: impl Into<String>, reason: DenyReason) -> Self {
        let input = input.into();
        match reason {
            DenyReason::Traversal(kind) => Self::Traversal { input, kind },
            DenyReason::ExactMatch(rule) => Self::ExactMatch { input, rule },
            DenyReason::SegmentMatch(rule) => Self::SegmentMatch { input, rule },
        }
    }

    /// Classify an error from opening `path`.
    pub fn from_open(path: PathBuf, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }

    /// The process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) => exit::USAGE,
            Self::Traversal { .. } => exit::TRAVERSAL,
            Self::ExactMatch { .. } => exit::EXACT_MATCH,
            Self::SegmentMatch { .. } => exit::SEGMENT_MATCH,
            Self::NotFound { .. } => exit::NOT_FOUND,
            Self::PermissionDenied { .. } | Self::IsDirectory { .. } => exit::UNREADABLE,
            Self::SymlinkEscape { .. } => exit::SYMLINK_ESCAPE,
            Self::Io { .. } => exit::IO,
            Self::Privilege(_) => exit::PRIVILEGE,
        }
    }
}

/// Renders a path with control characters escaped, for diagnostics.
fn escaped(path: &Path) -> String {
    path.to_string_lossy().escape_debug().to_string()
}
