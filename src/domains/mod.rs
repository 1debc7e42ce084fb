//! Business logic organized by capability.
//!
//! - **dump**: resolve a request, apply the access policy, and stream the
//!   file with elevated rights.

pub mod dump;
