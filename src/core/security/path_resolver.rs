use std::ffi::{OsStr, OsString};
use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{debug, instrument, warn};

/// The directory subtree this tool is allowed to expose.
///
/// Built once from configuration and never derived from caller input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TrustedRoot(PathBuf);

impl TrustedRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl Default for TrustedRoot {
    fn default() -> Self {
        Self(PathBuf::from("/proc"))
    }
}

impl fmt::Display for TrustedRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// How a caller-supplied path tried to leave the trusted root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalKind {
    /// The input contains `..` somewhere.
    ParentSegment,
    /// The input starts with `/`.
    AbsolutePath,
    /// The input contains a NUL byte.
    NulByte,
}

impl fmt::Display for TraversalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParentSegment => f.write_str("parent-directory sequence '..'"),
            Self::AbsolutePath => f.write_str("absolute path"),
            Self::NulByte => f.write_str("embedded NUL byte"),
        }
    }
}

/// Errors produced while resolving caller input against the trusted root.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("path argument is empty")]
    Empty,

    #[error("path '{}' escapes the trusted root: {kind}", input.escape_debug())]
    Traversal { input: String, kind: TraversalKind },
}

/// A path under the trusted root that passed the traversal checks.
///
/// Only [`resolve`] constructs one, so holding a `CandidatePath` means the
/// lexical containment checks already succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePath {
    path: PathBuf,
    relative: PathBuf,
}

impl CandidatePath {
    /// The full path, trusted root included.
    pub fn as_path(&self) -> &Path {
        &self.path
    }

    /// The caller-supplied part below the trusted root.
    pub fn relative(&self) -> &Path {
        &self.relative
    }

    /// Named segments below the trusted root, in order.
    ///
    /// Empty and `.` segments are skipped, so `1//./mem/` yields `1`, `mem`.
    pub fn segments(&self) -> impl Iterator<Item = &OsStr> {
        self.relative.components().filter_map(|component| match component {
            Component::Normal(segment) => Some(segment),
            _ => None,
        })
    }

    /// The last named segment.
    pub fn file_name(&self) -> Option<&OsStr> {
        self.segments().last()
    }
}

impl AsRef<Path> for CandidatePath {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

/// Control characters in caller bytes are escaped.
impl fmt::Display for CandidatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.to_string_lossy().escape_debug())
    }
}

/// Builds the candidate path for `input` below `root`.
///
/// This is a purely lexical operation. Nothing is canonicalized and no
/// symlink is followed; the input is rejected outright if it contains `..`
/// anywhere, starts with `/`, or carries a NUL byte. The same `..` check is
/// repeated on the assembled candidate so a bad root cannot slip through.
#[instrument(level = "debug", skip_all, fields(root = %root))]
pub fn resolve(root: &TrustedRoot, input: &OsStr) -> Result<CandidatePath, ResolveError> {
    let bytes = input.as_bytes();
    if bytes.is_empty() {
        return Err(ResolveError::Empty);
    }

    if let Some(kind) = traversal_kind(bytes) {
        warn!("Rejected path {:?}: {}", input, kind);
        return Err(ResolveError::Traversal {
            input: input.to_string_lossy().into_owned(),
            kind,
        });
    }

    let root = root.as_path().as_os_str();
    let mut joined = OsString::with_capacity(root.len() + 1 + input.len());
    joined.push(root);
    if !root.as_bytes().ends_with(b"/") {
        joined.push("/");
    }
    joined.push(input);

    if contains_parent_sequence(joined.as_bytes()) {
        warn!("Rejected candidate {:?}: trusted root contains '..'", joined);
        return Err(ResolveError::Traversal {
            input: input.to_string_lossy().into_owned(),
            kind: TraversalKind::ParentSegment,
        });
    }

    debug!("Resolved candidate {:?}", joined);
    Ok(CandidatePath {
        path: PathBuf::from(joined),
        relative: PathBuf::from(input),
    })
}

fn traversal_kind(bytes: &[u8]) -> Option<TraversalKind> {
    if contains_parent_sequence(bytes) {
        Some(TraversalKind::ParentSegment)
    } else if bytes.first() == Some(&b'/') {
        Some(TraversalKind::AbsolutePath)
    } else if bytes.contains(&0) {
        Some(TraversalKind::NulByte)
    } else {
        None
    }
}

pub(crate) fn contains_parent_sequence(bytes: &[u8]) -> bool {
    bytes.windows(2).any(|pair| pair == b"..")
}
