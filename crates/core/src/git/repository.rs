//! Conflict source backed by a git working tree.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::runner::CommandRunner;
use super::status::conflicted_files;
use crate::conflict::{ConflictKind, ConflictedFile};
use crate::errors::GitError;
use crate::resolver::ConflictSource;

/// Whether the working tree is mid-merge or mid-rebase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoState {
    pub in_merge: bool,
    pub in_rebase: bool,
}

impl RepoState {
    /// `true` when there can be unmerged paths to resolve.
    pub fn has_pending_conflicts(&self) -> bool {
        self.in_merge || self.in_rebase
    }
}

/// Reads conflict state from a repository through a [`CommandRunner`].
#[derive(Debug, Clone)]
pub struct GitRepository<R> {
    runner: R,
}

impl<R: CommandRunner> GitRepository<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Check `MERGE_HEAD` and the rebase state directories.
    #[instrument(skip(self))]
    pub async fn detect_state(&self) -> Result<RepoState, GitError> {
        let in_merge = self.succeeds(&["rev-parse", "--verify", "MERGE_HEAD"]).await?;
        let in_rebase = self.in_rebase().await?;
        let state = RepoState {
            in_merge,
            in_rebase,
        };
        debug!(?state, "detected repository state");
        Ok(state)
    }

    /// All unmerged paths, in the order `git status` reports them.
    #[instrument(skip(self))]
    pub async fn list_conflicts(&self) -> Result<Vec<ConflictedFile>, GitError> {
        let output = self.runner.run(&["status", "--porcelain"]).await?;
        let files = conflicted_files(&output);
        info!(count = files.len(), "listed conflicted files");
        Ok(files)
    }

    /// Current conflict kind of a single path, or `None` if it is not
    /// unmerged.
    pub async fn conflict_kind(&self, path: &str) -> Result<Option<ConflictKind>, GitError> {
        let output = self
            .runner
            .run(&["status", "--porcelain", "--", path])
            .await?;
        Ok(conflicted_files(&output)
            .into_iter()
            .find(|file| file.path == path)
            .map(|file| file.kind))
    }

    /// Commit the staged resolution.
    #[instrument(skip(self, message))]
    pub async fn commit(&self, message: &str) -> Result<(), GitError> {
        self.runner.run(&["commit", "-m", message]).await?;
        info!("committed resolution");
        Ok(())
    }

    async fn in_rebase(&self) -> Result<bool, GitError> {
        let git_dir = match self.runner.run(&["rev-parse", "--git-dir"]).await {
            Ok(out) => out.trim().to_string(),
            Err(GitError::CommandFailed { stderr, .. }) => {
                debug!(%stderr, "not inside a git repository");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        let git_dir = self.runner.work_dir().join(git_dir);
        for marker in ["rebase-merge", "rebase-apply"] {
            if tokio::fs::try_exists(git_dir.join(marker)).await? {
                debug!(marker, "rebase in progress");
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Run a command whose exit status is the answer.
    async fn succeeds(&self, args: &[&str]) -> Result<bool, GitError> {
        match self.runner.run(args).await {
            Ok(_) => Ok(true),
            Err(GitError::CommandFailed { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl<R: CommandRunner> ConflictSource for GitRepository<R> {
    async fn detect_state(&self) -> Result<RepoState, GitError> {
        GitRepository::detect_state(self).await
    }

    async fn list_conflicts(&self) -> Result<Vec<ConflictedFile>, GitError> {
        GitRepository::list_conflicts(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::fake::FakeGit;

    #[tokio::test]
    async fn test_detect_merge_state() {
        let fake = FakeGit::new("/nonexistent-worktree");
        fake.respond("rev-parse --verify MERGE_HEAD", "abc123\n");
        fake.respond("rev-parse --git-dir", ".git\n");
        let repo = GitRepository::new(fake);

        let state = repo.detect_state().await.unwrap();
        assert!(state.in_merge);
        assert!(!state.in_rebase);
        assert!(state.has_pending_conflicts());
    }

    #[tokio::test]
    async fn test_detect_no_state() {
        let fake = FakeGit::new("/nonexistent-worktree");
        fake.fail("rev-parse --verify MERGE_HEAD");
        fake.fail("rev-parse --git-dir");
        let repo = GitRepository::new(fake);

        let state = repo.detect_state().await.unwrap();
        assert_eq!(state, RepoState::default());
        assert!(!state.has_pending_conflicts());
    }

    #[tokio::test]
    async fn test_detect_rebase_state_from_marker_dirs() {
        for marker in ["rebase-merge", "rebase-apply"] {
            let dir = tempfile::tempdir().unwrap();
            std::fs::create_dir_all(dir.path().join(".git").join(marker)).unwrap();

            let fake = FakeGit::new(dir.path());
            fake.fail("rev-parse --verify MERGE_HEAD");
            fake.respond("rev-parse --git-dir", ".git\n");
            let repo = GitRepository::new(fake);

            let state = repo.detect_state().await.unwrap();
            assert!(!state.in_merge);
            assert!(state.in_rebase, "marker {marker}");
        }
    }

    #[tokio::test]
    async fn test_list_conflicts_parses_porcelain() {
        let fake = FakeGit::new("/repo");
        fake.respond(
            "status --porcelain",
            "UU package.json\n M README.md\nDU src/old.ts\n",
        );
        let repo = GitRepository::new(fake);

        let files = repo.list_conflicts().await.unwrap();
        assert_eq!(
            files,
            vec![
                ConflictedFile::new("package.json", ConflictKind::BothModified),
                ConflictedFile::new("src/old.ts", ConflictKind::DeletedByUs),
            ]
        );
    }

    #[tokio::test]
    async fn test_conflict_kind_single_path() {
        let fake = FakeGit::new("/repo");
        fake.respond("status --porcelain -- a.txt", "AA a.txt\n");
        fake.respond("status --porcelain -- b.txt", "M  b.txt\n");
        let repo = GitRepository::new(fake);

        assert_eq!(
            repo.conflict_kind("a.txt").await.unwrap(),
            Some(ConflictKind::BothAdded)
        );
        assert_eq!(repo.conflict_kind("b.txt").await.unwrap(), None);
        assert_eq!(repo.conflict_kind("c.txt").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_commit_command_shape() {
        let repo = GitRepository::new(FakeGit::new("/repo"));
        repo.commit("Resolve conflicts").await.unwrap();
        assert_eq!(repo.runner().calls(), vec!["commit -m Resolve conflicts"]);
    }

    #[tokio::test]
    async fn test_list_conflicts_propagates_failure() {
        let fake = FakeGit::new("/repo");
        fake.fail("status --porcelain");
        let repo = GitRepository::new(fake);
        assert!(matches!(
            repo.list_conflicts().await,
            Err(GitError::CommandFailed { .. })
        ));
    }
}
