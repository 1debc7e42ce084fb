//! procdump library
//!
//! Resolves a caller-supplied path below a trusted root (`/proc` by default),
//! refuses anything that could leave that root or that matches an exclusion
//! rule, and only then reads the file with elevated rights.
//!
//! # Architecture
//!
//! - **core**: configuration, error handling, privilege control, and the
//!   path security layer (resolver and access policy)
//! - **domains**: business logic
//!   - **dump**: the privileged reader and the request orchestration
//!
//! # Example
//!
//! ```rust,no_run
//! use std::ffi::OsStr;
//!
//! use procdump::core::{Config, SetuidPrivilege};
//! use procdump::domains::dump::DumpService;
//!
//! fn main() -> procdump::Result<()> {
//!     let privilege = SetuidPrivilege::capture()?;
//!     let config = Config::from_env();
//!     config.validate()?;
//!
//!     let service = DumpService::new(config, privilege);
//!     let mut stdout = std::io::stdout().lock();
//!     service.dump(OsStr::new("net/ip_conntrack"), &mut stdout)?;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, Result};
pub use domains::dump::{DumpError, DumpService};
