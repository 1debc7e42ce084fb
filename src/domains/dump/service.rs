//! Dump service: resolve, check, then read.

use std::ffi::OsStr;
use std::io::Write;

use tracing::{info, instrument};

use super::error::DumpError;
use super::reader::PrivilegedReader;
use crate::core::config::Config;
use crate::core::privilege::PrivilegeControl;
use crate::core::security::{Decision, DenyReason, ResolveError, check, resolve};

/// Runs single dump requests against a fixed configuration.
pub struct DumpService<P> {
    config: Config,
    privilege: P,
}

impl<P: PrivilegeControl> DumpService<P> {
    pub fn new(config: Config, privilege: P) -> Self {
        Self { config, privilege }
    }

    /// Decides whether `input` may be dumped.
    ///
    /// Pure: no privilege change and no filesystem access. Traversal attempts
    /// come back as `Decision::Deny`; only an empty input is an error.
    #[instrument(skip_all, fields(input = ?input))]
    pub fn evaluate(&self, input: &OsStr) -> Result<Decision, DumpError> {
        let security = &self.config.security;
        match resolve(&security.trusted_root, input) {
            Ok(candidate) => Ok(check(candidate, &security.rules)),
            Err(ResolveError::Traversal { kind, .. }) => {
                Ok(Decision::Deny(DenyReason::Traversal(kind)))
            }
            Err(ResolveError::Empty) => Err(DumpError::usage("PATH must not be empty")),
        }
    }

    /// Evaluates `input` and, if allowed, streams the file into `sink`.
    pub fn dump<W: Write>(&self, input: &OsStr, sink: &mut W) -> Result<u64, DumpError> {
        match self.evaluate(input)? {
            Decision::Allow(candidate) => {
                info!("Dumping {}", candidate);
                PrivilegedReader::new(&self.privilege, &self.config)
                    .read_and_stream(&candidate, sink)
            }
            Decision::Deny(reason) => Err(DumpError::denied(input.to_string_lossy(), reason)),
        }
    }
}
