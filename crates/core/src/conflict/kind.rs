//! Conflict classification.
//!
//! Maps the two-character codes from `git status --porcelain` onto the
//! closed set of unmerged shapes. Anything outside the seven unmerged codes
//! is not a conflict and is rejected with
//! [`ConflictError::UnsupportedStatus`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ConflictError;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The shape of an unmerged path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictKind {
    /// `UU`: both sides modified the file.
    BothModified,
    /// `AA`: both sides added a file at the same path.
    BothAdded,
    /// `DU`: we deleted, they modified.
    DeletedByUs,
    /// `UD`: they deleted, we modified.
    DeletedByThem,
    /// `DD`: both sides deleted (rename/rename fallout).
    #[serde(rename = "both-deleted")]
    DeletedByBoth,
    /// `AU`: added by us only (rename/rename fallout).
    AddedByUs,
    /// `UA`: added by them only (rename/rename fallout).
    AddedByThem,
}

impl ConflictKind {
    /// Every kind, in status-code order.
    pub const ALL: [ConflictKind; 7] = [
        Self::BothModified,
        Self::BothAdded,
        Self::DeletedByUs,
        Self::DeletedByThem,
        Self::DeletedByBoth,
        Self::AddedByUs,
        Self::AddedByThem,
    ];

    /// The two-character porcelain code for this kind.
    pub fn status_code(self) -> &'static str {
        match self {
            Self::BothModified => "UU",
            Self::BothAdded => "AA",
            Self::DeletedByUs => "DU",
            Self::DeletedByThem => "UD",
            Self::DeletedByBoth => "DD",
            Self::AddedByUs => "AU",
            Self::AddedByThem => "UA",
        }
    }

    /// Kinds left behind by rename/rename and similar tree-level conflicts,
    /// where only one side (or neither) still has the path.
    pub fn is_rename_fallout(self) -> bool {
        matches!(
            self,
            Self::DeletedByBoth | Self::AddedByUs | Self::AddedByThem
        )
    }
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BothModified => write!(f, "both-modified"),
            Self::BothAdded => write!(f, "both-added"),
            Self::DeletedByUs => write!(f, "deleted-by-us"),
            Self::DeletedByThem => write!(f, "deleted-by-them"),
            Self::DeletedByBoth => write!(f, "both-deleted"),
            Self::AddedByUs => write!(f, "added-by-us"),
            Self::AddedByThem => write!(f, "added-by-them"),
        }
    }
}

impl FromStr for ConflictKind {
    type Err = ConflictError;

    /// Parse a config identifier. Accepts the kebab-case names printed by
    /// `Display` and their snake_case spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('_', "-").to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.to_string() == normalized)
            .ok_or_else(|| ConflictError::UnknownKind(s.to_string()))
    }
}

/// A conflicted path and its shape. Lives for one resolution pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictedFile {
    /// Path relative to the repository root, forward-slash separated.
    pub path: String,
    pub kind: ConflictKind,
}

impl ConflictedFile {
    pub fn new(path: impl Into<String>, kind: ConflictKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Classify a porcelain status code.
pub fn classify(status_code: &str) -> Result<ConflictKind, ConflictError> {
    match status_code {
        "UU" => Ok(ConflictKind::BothModified),
        "AA" => Ok(ConflictKind::BothAdded),
        "DU" => Ok(ConflictKind::DeletedByUs),
        "UD" => Ok(ConflictKind::DeletedByThem),
        "DD" => Ok(ConflictKind::DeletedByBoth),
        "AU" => Ok(ConflictKind::AddedByUs),
        "UA" => Ok(ConflictKind::AddedByThem),
        other => Err(ConflictError::UnsupportedStatus(other.to_string())),
    }
}
