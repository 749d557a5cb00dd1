//! Conflict resolver core library.
//!
//! This crate provides the components for resolving merge and rebase
//! conflicts from a list of declarative rules: rules-file loading, conflict
//! classification, first-match rule matching, the per-kind resolution
//! executor, the git command plumbing underneath it, and the orchestrator
//! that drives a full pass.

pub mod config;
pub mod conflict;
pub mod errors;
pub mod git;
pub mod observer;
pub mod resolver;

// Re-exports for convenience.
pub use config::{RuleSet, RulesFile, DEFAULT_CONFIG_PATH};
pub use conflict::{ConflictKind, ConflictedFile, ResolutionRule, ResolutionStrategy};
pub use errors::CoreError;
pub use git::{GitCli, GitRepository};
pub use observer::{Observer, SharedObserver, TracingObserver};
pub use resolver::{ConflictResolver, ResolutionPlan, ResolutionResult};
