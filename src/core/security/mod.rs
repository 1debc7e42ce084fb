// Security module for path resolution and access policy
//
// Caller input is resolved lexically against the trusted root, then checked
// against the exclusion rules. Both steps are pure and run before any
// privilege change.

pub mod access_policy;
pub mod path_resolver;

pub use access_policy::{Decision, DenyReason, ExclusionRule, check};
pub use path_resolver::{CandidatePath, ResolveError, TraversalKind, TrustedRoot, resolve};
