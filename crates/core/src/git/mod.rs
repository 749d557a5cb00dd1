//! Git CLI plumbing for the conflict resolver.

pub mod repository;
pub mod runner;
pub mod status;

#[cfg(test)]
pub(crate) mod fake;

pub use repository::{GitRepository, RepoState};
pub use runner::{CommandRunner, GitCli};
