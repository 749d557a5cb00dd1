//! Conflict classification, rule matching, and resolution.
//!
//! The conflict subsystem is responsible for:
//! 1. **Classification** -- mapping porcelain status codes to a [`ConflictKind`].
//! 2. **Matching** -- picking the first applicable [`ResolutionRule`] for a file.
//! 3. **Execution** -- running the git commands that realise a strategy.

pub mod executor;
pub mod kind;
pub mod matcher;
pub mod rule;

pub use executor::{ResolutionAction, ResolutionExecutor};
pub use kind::{classify, ConflictKind, ConflictedFile};
pub use matcher::{path_matches, FalloutPolicy, RuleMatcher};
pub use rule::{ResolutionRule, ResolutionStrategy};
