//! Dump domain module.
//!
//! A dump request goes through three steps, strictly in this order:
//!
//! 1. the input is resolved against the trusted root (`core::security`),
//! 2. the candidate is checked against the exclusion rules,
//! 3. only on `Allow`, privileges are raised for the open and the file is
//!    streamed by the [`PrivilegedReader`].
//!
//! ## Architecture
//!
//! - `service.rs` - Orchestrates the three steps
//! - `reader.rs` - Privileged open and chunked copy
//! - `error.rs` - Dump errors and the exit-status table

mod error;
mod reader;
mod service;

pub use error::{DumpError, exit};
pub use reader::{PrivilegedReader, stream};
pub use service::DumpService;
