//! Resolution rules as loaded from the rules file.
//!
//! A rule is plain data. Matching policy lives in
//! [`RuleMatcher`](super::matcher::RuleMatcher) so the storage format can
//! change without touching how rules are applied.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::kind::ConflictKind;

/// Which side wins for a matched file.
///
/// "Manual" is not a strategy: a file with no matching rule simply has no
/// strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionStrategy {
    Ours,
    Theirs,
}

impl ResolutionStrategy {
    /// The `git checkout` flag selecting this side.
    pub fn checkout_flag(self) -> &'static str {
        match self {
            Self::Ours => "--ours",
            Self::Theirs => "--theirs",
        }
    }

    /// The index stage holding this side's blob during a conflict.
    pub fn index_stage(self) -> u8 {
        match self {
            Self::Ours => 2,
            Self::Theirs => 3,
        }
    }
}

impl std::fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ours => write!(f, "ours"),
            Self::Theirs => write!(f, "theirs"),
        }
    }
}

impl FromStr for ResolutionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ours" => Ok(Self::Ours),
            "theirs" => Ok(Self::Theirs),
            other => Err(format!(
                "invalid strategy \"{other}\": must be \"ours\" or \"theirs\""
            )),
        }
    }
}

/// One entry of the ordered rule list. Declaration order is priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRule {
    /// Glob matched against the repository-relative path.
    pub path_pattern: String,
    /// Restrict the rule to one conflict kind. `None` applies to all kinds.
    pub kind: Option<ConflictKind>,
    pub strategy: ResolutionStrategy,
    /// Free-form note, logged when the rule fires.
    pub description: Option<String>,
}

impl ResolutionRule {
    pub fn new(path_pattern: impl Into<String>, strategy: ResolutionStrategy) -> Self {
        Self {
            path_pattern: path_pattern.into(),
            kind: None,
            strategy,
            description: None,
        }
    }

    pub fn with_kind(mut self, kind: ConflictKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
