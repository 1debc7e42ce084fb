//! Core module containing shared infrastructure components.
//!
//! This module provides configuration, error handling, privilege control
//! and the path security layer.

pub mod config;
pub mod error;
pub mod privilege;
pub mod security;

pub use config::{Config, SymlinkPolicy};
pub use error::{Error, Result};
pub use privilege::{PrivilegeControl, PrivilegeError, SetuidPrivilege};
pub use security::{CandidatePath, Decision, DenyReason, ExclusionRule, TrustedRoot};
