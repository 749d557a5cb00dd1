//! First-match rule selection.
//!
//! # Decision model
//!
//! For each conflicted file the matcher walks the rule list in declaration
//! order and stops at the first rule where:
//!
//! | Check | Passes when |
//! |-------|-------------|
//! | Kind eligibility | the file's kind is not excluded by [`FalloutPolicy`] |
//! | Path | the rule's glob matches the repository-relative path |
//! | Kind filter | the rule has no `kind`, or it equals the file's kind |
//!
//! No match is not an error: it means the file needs manual resolution.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::kind::{ConflictKind, ConflictedFile};
use super::rule::{ResolutionRule, ResolutionStrategy};

/// Whether rename/rename fallout kinds (`DD`, `AU`, `UA`) may be resolved
/// automatically.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FalloutPolicy {
    /// Rules apply to every kind.
    #[default]
    Resolve,
    /// Fallout kinds never match any rule and are left for a human.
    Manual,
}

/// Pure rule matcher. Cheap to copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleMatcher {
    fallout: FalloutPolicy,
}

impl RuleMatcher {
    pub fn new(fallout: FalloutPolicy) -> Self {
        Self { fallout }
    }

    pub fn fallout_policy(&self) -> FalloutPolicy {
        self.fallout
    }

    /// Whether any rule is allowed to match a file of this kind.
    pub fn is_eligible(&self, kind: ConflictKind) -> bool {
        match self.fallout {
            FalloutPolicy::Resolve => true,
            FalloutPolicy::Manual => !kind.is_rename_fallout(),
        }
    }

    /// Return the first rule, in declaration order, that applies to `file`.
    pub fn find_matching_rule<'r>(
        &self,
        file: &ConflictedFile,
        rules: &'r [ResolutionRule],
    ) -> Option<&'r ResolutionRule> {
        if !self.is_eligible(file.kind) {
            debug!(path = %file.path, kind = %file.kind, "kind excluded from automatic resolution");
            return None;
        }

        let found = rules.iter().enumerate().find(|(_, rule)| {
            path_matches(&rule.path_pattern, &file.path)
                && rule.kind.is_none_or(|kind| kind == file.kind)
        });

        match found {
            Some((index, rule)) => {
                debug!(
                    path = %file.path,
                    kind = %file.kind,
                    rule = index,
                    pattern = %rule.path_pattern,
                    description = rule.description.as_deref().unwrap_or(""),
                    "rule matched"
                );
                Some(rule)
            }
            None => {
                debug!(path = %file.path, kind = %file.kind, "no rule matched");
                None
            }
        }
    }

    /// The strategy of the first matching rule, or `None` for manual.
    pub fn determine_strategy(
        &self,
        file: &ConflictedFile,
        rules: &[ResolutionRule],
    ) -> Option<ResolutionStrategy> {
        self.find_matching_rule(file, rules).map(|rule| rule.strategy)
    }
}

/// Test whether `path` matches a glob `pattern`.
///
/// - `*` matches within one path segment
/// - `**` matches across segments
/// - everything else is literal
pub fn path_matches(pattern: &str, path: &str) -> bool {
    let path = path.replace('\\', "/");
    let pattern = pattern.replace('\\', "/");
    glob_match::glob_match(&pattern, &path)
}
