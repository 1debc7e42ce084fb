//! Configuration for procdump.
//!
//! The trusted root and the exclusion rules are compiled in. The binary runs
//! with elevated rights and its whole environment belongs to the caller, so
//! only the log level may be taken from it.

use std::os::unix::ffi::OsStrExt;

use serde::Serialize;
use tracing::info;

use super::error::{Error, Result};
use super::security::path_resolver::contains_parent_sequence;
use super::security::{ExclusionRule, TrustedRoot};

/// Environment variable holding the log level filter.
pub const LOG_LEVEL_ENV: &str = "PROCDUMP_LOG_LEVEL";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Config {
    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Trusted root, exclusion rules and symlink handling.
    pub security: SecurityConfig,

    /// Streaming parameters.
    pub reader: ReaderConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "warn", "debug", "trace").
    pub level: String,
}

/// Configuration for path resolution and the access policy.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityConfig {
    /// The only directory subtree that may be dumped.
    pub trusted_root: TrustedRoot,

    /// Exclusion rules, evaluated in order.
    pub rules: Vec<ExclusionRule>,

    /// What to do when the opened file turns out to live elsewhere.
    pub symlinks: SymlinkPolicy,
}

/// Handling of symlinks met while opening an allowed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SymlinkPolicy {
    /// The opened file must resolve to a path under the trusted root.
    #[default]
    Contain,

    /// Whatever the filesystem resolves to is read.
    Follow,
}

/// Parameters of the copy loop.
#[derive(Debug, Clone, Serialize)]
pub struct ReaderConfig {
    /// Size in bytes of each read from the source file.
    pub chunk_size: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "error".to_string(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            trusted_root: TrustedRoot::default(),
            rules: default_rules(),
            symlinks: SymlinkPolicy::default(),
        }
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self { chunk_size: 8192 }
    }
}

/// The compiled-in exclusion rules.
///
/// `root` and `cwd` are magic links into the target process's view of the
/// filesystem, so they have to be blocked as whole subtrees. `kmsg` is
/// consumed by reading it, so a dump would steal messages from the logger.
pub fn default_rules() -> Vec<ExclusionRule> {
    let exact = [
        "mem",
        "kmem",
        "kcore",
        "kmsg",
        "environ",
        "pagemap",
        "kpageflags",
        "kpagecount",
        "kpagecgroup",
        "exe",
    ];
    let segment = ["fd", "fdinfo", "map_files", "root", "cwd"];

    exact
        .into_iter()
        .map(ExclusionRule::exact)
        .chain(segment.into_iter().map(ExclusionRule::segment))
        .collect()
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Only `PROCDUMP_LOG_LEVEL` is honoured.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
            config.logging.level = level;
        }

        config
    }

    /// Checks that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        let root = self.security.trusted_root.as_path();
        if !root.is_absolute() {
            return Err(Error::config(format!(
                "trusted root '{}' is not absolute",
                root.display()
            )));
        }
        if contains_parent_sequence(root.as_os_str().as_bytes()) {
            return Err(Error::config(format!(
                "trusted root '{}' contains '..'",
                root.display()
            )));
        }

        for rule in &self.security.rules {
            let name = rule.name();
            if name.is_empty() || name == "." || name.contains('/') || name.contains("..") {
                return Err(Error::config(format!("invalid exclusion rule: {rule}")));
            }
        }

        if self.reader.chunk_size == 0 {
            return Err(Error::config("reader chunk size must be non-zero"));
        }

        info!(
            "Trusted root {} with {} exclusion rules",
            self.security.trusted_root,
            self.security.rules.len()
        );
        Ok(())
    }
}
