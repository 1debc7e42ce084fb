//! Privileged reader.
//!
//! Opens an already-allowed [`CandidatePath`] with raised privileges, lowers
//! them again, then copies the file to the output sink in fixed-size chunks.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use super::error::DumpError;
use crate::core::config::{Config, SecurityConfig, SymlinkPolicy};
use crate::core::privilege::PrivilegeControl;
use crate::core::security::{CandidatePath, TrustedRoot};

/// Reads allowed paths with elevated rights.
pub struct PrivilegedReader<'a, P> {
    privilege: &'a P,
    security: &'a SecurityConfig,
    chunk_size: usize,
}

impl<'a, P: PrivilegeControl> PrivilegedReader<'a, P> {
    pub fn new(privilege: &'a P, config: &'a Config) -> Self {
        Self {
            privilege,
            security: &config.security,
            chunk_size: config.reader.chunk_size,
        }
    }

    /// Streams `candidate` into `sink` and returns the number of bytes copied.
    ///
    /// Privileges are raised only for the `open(2)` and lowered again before
    /// the first byte is read, whether or not the open succeeded. The path is
    /// used exactly as resolved; nothing is rebuilt from caller input here.
    #[instrument(skip_all, fields(path = %candidate))]
    pub fn read_and_stream<W: Write>(
        &self,
        candidate: &CandidatePath,
        sink: &mut W,
    ) -> Result<u64, DumpError> {
        self.privilege.raise()?;
        let opened = self.open(candidate);
        self.privilege.lower()?;
        let file = opened?;

        let copied = stream(file, sink, self.chunk_size).map_err(|source| DumpError::Io {
            path: candidate.as_path().to_path_buf(),
            source,
        })?;

        info!("Streamed {} bytes", copied);
        Ok(copied)
    }

    fn open(&self, candidate: &CandidatePath) -> Result<File, DumpError> {
        let path = candidate.as_path();
        let file = File::open(path).map_err(|e| {
            warn!("Failed to open {:?}: {}", path, e);
            DumpError::from_open(path.to_path_buf(), e)
        })?;

        if self.security.symlinks == SymlinkPolicy::Contain {
            ensure_contained(&file, candidate, &self.security.trusted_root)?;
        }

        let metadata = file.metadata().map_err(|source| io_error(path, source))?;
        if metadata.is_dir() {
            warn!("Refusing to stream directory {}", candidate);
            return Err(DumpError::IsDirectory {
                path: path.to_path_buf(),
            });
        }

        Ok(file)
    }
}

/// Copies `source` into `sink` `chunk_size` bytes at a time, then flushes.
pub fn stream<R: Read, W: Write>(
    mut source: R,
    sink: &mut W,
    chunk_size: usize,
) -> io::Result<u64> {
    let mut buf = vec![0u8; chunk_size];
    let mut total = 0u64;

    loop {
        let n = match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        sink.write_all(&buf[..n])?;
        total += n as u64;
    }

    sink.flush()?;
    Ok(total)
}

/// Checks that the opened descriptor lives under the trusted root.
///
/// Looks at the file that was actually opened, not at the path again, so a
/// link swapped in after the open cannot change the answer.
fn ensure_contained(
    file: &File,
    candidate: &CandidatePath,
    root: &TrustedRoot,
) -> Result<(), DumpError> {
    let canonical_root = root
        .as_path()
        .canonicalize()
        .map_err(|source| io_error(root.as_path(), source))?;
    let target = opened_path(file, candidate)
        .map_err(|source| io_error(candidate.as_path(), source))?;

    if !target.starts_with(&canonical_root) {
        warn!(
            "{} resolves to {:?}, outside {:?}",
            candidate, target, canonical_root
        );
        return Err(DumpError::SymlinkEscape {
            path: candidate.as_path().to_path_buf(),
            target,
        });
    }

    debug!("{} resolves to {:?}", candidate, target);
    Ok(())
}

#[cfg(target_os = "linux")]
fn opened_path(file: &File, _candidate: &CandidatePath) -> io::Result<PathBuf> {
    use std::os::fd::AsRawFd;

    fs::read_link(format!("/proc/self/fd/{}", file.as_raw_fd()))
}

#[cfg(not(target_os = "linux"))]
fn opened_path(_file: &File, candidate: &CandidatePath) -> io::Result<PathBuf> {
    fs::canonicalize(candidate.as_path())
}

fn io_error(path: &Path, source: io::Error) -> DumpError {
    DumpError::Io {
        path: path.to_path_buf(),
        source,
    }
}
