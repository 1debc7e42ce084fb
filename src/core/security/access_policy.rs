use std::fmt;

use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::path_resolver::{CandidatePath, TraversalKind};

/// A name that is always denied even though it lies under the trusted root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum ExclusionRule {
    /// Matches when the last segment equals the name (e.g. `1/mem`).
    Exact(String),

    /// Matches when any segment equals the name, blocking the whole subtree
    /// below it (e.g. `1/fd/0`, `1/task/1/fd/3`).
    Segment(String),
}

impl ExclusionRule {
    pub fn exact(name: impl Into<String>) -> Self {
        Self::Exact(name.into())
    }

    pub fn segment(name: impl Into<String>) -> Self {
        Self::Segment(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Exact(name) | Self::Segment(name) => name,
        }
    }

    /// Whether this rule denies `candidate`.
    pub fn matches(&self, candidate: &CandidatePath) -> bool {
        match self {
            Self::Exact(name) => candidate
                .file_name()
                .is_some_and(|last| last == name.as_str()),
            Self::Segment(name) => candidate.segments().any(|segment| segment == name.as_str()),
        }
    }

    fn deny_reason(&self) -> DenyReason {
        match self {
            Self::Exact(name) => DenyReason::ExactMatch(name.clone()),
            Self::Segment(name) => DenyReason::SegmentMatch(name.clone()),
        }
    }
}

impl fmt::Display for ExclusionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(name) => write!(f, "exact '{name}'"),
            Self::Segment(name) => write!(f, "segment '{name}'"),
        }
    }
}

/// Why a request was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// The input tried to leave the trusted root.
    Traversal(TraversalKind),
    /// The last segment matched an exact-name rule.
    ExactMatch(String),
    /// Some segment matched a path-segment rule.
    SegmentMatch(String),
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Traversal(kind) => write!(f, "traversal ({kind})"),
            Self::ExactMatch(name) => write!(f, "matches exact-name rule '{name}'"),
            Self::SegmentMatch(name) => write!(f, "matches path-segment rule '{name}'"),
        }
    }
}

/// Outcome of evaluating a request against the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(CandidatePath),
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow(_))
    }
}

/// Checks `candidate` against `rules`.
///
/// Rules are tried in order and the first match decides the reason. This is
/// a pure function: it never touches the filesystem and must be called at
/// the caller's own privilege, before anything is elevated.
#[instrument(level = "debug", skip_all, fields(candidate = %candidate))]
pub fn check(candidate: CandidatePath, rules: &[ExclusionRule]) -> Decision {
    match rules.iter().find(|rule| rule.matches(&candidate)) {
        Some(rule) => {
            warn!("Denied {}: matches {} rule", candidate, rule);
            Decision::Deny(rule.deny_reason())
        }
        None => {
            debug!("Allowed {}", candidate);
            Decision::Allow(candidate)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::security::path_resolver::{TrustedRoot, resolve};
    use std::ffi::OsStr;

    fn candidate(input: &str) -> CandidatePath {
        resolve(&TrustedRoot::default(), OsStr::new(input)).unwrap()
    }

    fn rules() -> Vec<ExclusionRule> {
        vec![
            ExclusionRule::exact("mem"),
            ExclusionRule::exact("environ"),
            ExclusionRule::segment("fd"),
            ExclusionRule::segment("root"),
        ]
    }

    #[test]
    fn test_unmatched_path_is_allowed() {
        let decision = check(candidate("net/ip_conntrack"), &rules());

        match decision {
            Decision::Allow(path) => {
                assert_eq!(path.as_path(), std::path::Path::new("/proc/net/ip_conntrack"))
            }
            other => panic!("expected Allow, got {other:?}"),
        }
    }

    #[test]
    fn test_exact_rule_matches_last_segment() {
        assert_eq!(
            check(candidate("1/mem"), &rules()),
            Decision::Deny(DenyReason::ExactMatch("mem".to_string()))
        );
        assert_eq!(
            check(candidate("self/task/7/environ"), &rules()),
            Decision::Deny(DenyReason::ExactMatch("environ".to_string()))
        );
    }

    #[test]
    fn test_exact_rule_ignores_interior_segment() {
        let rules = vec![ExclusionRule::exact("mem")];
        assert!(check(candidate("mem/status"), &rules).is_allowed());
    }

    #[test]
    fn test_exact_rule_is_not_a_substring_match() {
        assert!(check(candidate("meminfo"), &rules()).is_allowed());
        assert!(check(candidate("1/smem"), &rules()).is_allowed());
    }

    #[test]
    fn test_segment_rule_matches_at_any_depth() {
        for input in ["1/fd/0", "self/task/12/fd/3", "1/fd", "1/root/etc/shadow"] {
            let decision = check(candidate(input), &rules());
            assert!(
                matches!(decision, Decision::Deny(DenyReason::SegmentMatch(_))),
                "input {input:?} should be denied, got {decision:?}"
            );
        }
        assert_eq!(
            check(candidate("1/fd/0"), &rules()),
            Decision::Deny(DenyReason::SegmentMatch("fd".to_string()))
        );
    }

    #[test]
    fn test_dot_segments_do_not_hide_matches() {
        assert_eq!(
            check(candidate("1/./mem"), &rules()),
            Decision::Deny(DenyReason::ExactMatch("mem".to_string()))
        );
        assert_eq!(
            check(candidate("1//fd/./0"), &rules()),
            Decision::Deny(DenyReason::SegmentMatch("fd".to_string()))
        );
    }

    #[test]
    fn test_first_matching_rule_wins() {
        // `1/fd/mem` matches both an exact and a segment rule.
        let exact_first = vec![ExclusionRule::exact("mem"), ExclusionRule::segment("fd")];
        let segment_first = vec![ExclusionRule::segment("fd"), ExclusionRule::exact("mem")];

        assert_eq!(
            check(candidate("1/fd/mem"), &exact_first),
            Decision::Deny(DenyReason::ExactMatch("mem".to_string()))
        );
        assert_eq!(
            check(candidate("1/fd/mem"), &segment_first),
            Decision::Deny(DenyReason::SegmentMatch("fd".to_string()))
        );
    }

    #[test]
    fn test_rules_are_case_sensitive() {
        assert!(check(candidate("1/MEM"), &rules()).is_allowed());
    }

    #[test]
    fn test_empty_rule_set_allows_everything() {
        assert!(check(candidate("1/mem"), &[]).is_allowed());
    }

    #[test]
    fn test_check_is_idempotent() {
        let rules = rules();
        for input in ["1/mem", "1/fd/0", "version"] {
            assert_eq!(
                check(candidate(input), &rules),
                check(candidate(input), &rules)
            );
        }
    }

    #[test]
    fn test_rule_serialization_shape() {
        let json = serde_json::to_string(&ExclusionRule::segment("fd")).unwrap();
        assert_eq!(json, r#"{"kind":"segment","name":"fd"}"#);

        let json = serde_json::to_string(&ExclusionRule::exact("mem")).unwrap();
        assert_eq!(json, r#"{"kind":"exact","name":"mem"}"#);
    }
}
