//! Applies a strategy to one conflicted path.
//!
//! `git checkout --ours/--theirs` is only right when both sides still have
//! content. Delete/modify and rename fallout need an explicit choice
//! between removing the path and keeping what is in the working tree:
//!
//! | Kind | Ours | Theirs |
//! |------|------|--------|
//! | `BothModified` | checkout `--ours`, add | checkout `--theirs`, add |
//! | `BothAdded` | stage-2 blob (checkout if binary), add | stage-3 blob (checkout if binary), add |
//! | `DeletedByUs` | rm | add |
//! | `DeletedByThem` | add | rm |
//! | `DeletedByBoth` | rm | rm |
//! | `AddedByUs` | add | rm |
//! | `AddedByThem` | rm | add |
//!
//! A successful resolution always leaves the path staged: either `add` is
//! the last command, or `rm` updated the index.

use std::path::Path;

use tracing::{debug, info, instrument};

use super::kind::{ConflictKind, ConflictedFile};
use super::rule::ResolutionStrategy;
use crate::errors::GitError;
use crate::git::runner::CommandRunner;
use crate::git::status::{check_attr_reports_binary, numstat_reports_binary};
use crate::observer::SharedObserver;

/// Extensions treated as binary when git gives no verdict.
const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "pdf", "zip", "tar", "gz", "exe", "dll", "so",
    "dylib", "bin", "dat",
];

/// Extensions treated as binary when the git lookups themselves fail.
const FALLBACK_BINARY_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "ico"];

/// What the executor did to the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionAction {
    /// `checkout --ours|--theirs` then `add`.
    CheckedOut,
    /// Side blob read with `show :N:<path>`, written out, then `add`.
    Reconstructed,
    /// Working-tree file kept and staged with `add`.
    Kept,
    /// Path removed with `rm`.
    Removed,
}

impl ResolutionAction {
    pub fn label(self) -> &'static str {
        match self {
            Self::CheckedOut => "checkout",
            Self::Reconstructed => "reconstruct",
            Self::Kept => "keep",
            Self::Removed => "remove",
        }
    }
}

/// Performs the git side effects for one file at a time.
pub struct ResolutionExecutor<R> {
    runner: R,
    observer: SharedObserver,
}

impl<R: CommandRunner> ResolutionExecutor<R> {
    pub fn new(runner: R, observer: SharedObserver) -> Self {
        Self { runner, observer }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Resolve `file` with `strategy`. Any failing git command aborts this
    /// file only; the caller decides what to do with the error.
    #[instrument(skip_all, fields(path = %file.path, kind = %file.kind, strategy = %strategy))]
    pub async fn resolve(
        &self,
        file: &ConflictedFile,
        strategy: ResolutionStrategy,
    ) -> Result<ResolutionAction, GitError> {
        let path = file.path.as_str();
        let action = match (file.kind, strategy) {
            (ConflictKind::BothModified, _) => {
                self.checkout(path, strategy).await?;
                self.stage(path).await?;
                ResolutionAction::CheckedOut
            }
            (ConflictKind::BothAdded, _) => self.resolve_both_added(path, strategy).await?,

            (ConflictKind::DeletedByUs, ResolutionStrategy::Ours)
            | (ConflictKind::DeletedByThem, ResolutionStrategy::Theirs)
            | (ConflictKind::DeletedByBoth, _)
            | (ConflictKind::AddedByUs, ResolutionStrategy::Theirs)
            | (ConflictKind::AddedByThem, ResolutionStrategy::Ours) => {
                self.remove(path).await?;
                ResolutionAction::Removed
            }

            (ConflictKind::DeletedByUs, ResolutionStrategy::Theirs)
            | (ConflictKind::DeletedByThem, ResolutionStrategy::Ours)
            | (ConflictKind::AddedByUs, ResolutionStrategy::Ours)
            | (ConflictKind::AddedByThem, ResolutionStrategy::Theirs) => {
                self.stage(path).await?;
                ResolutionAction::Kept
            }
        };

        self.observer.info(&describe(file, strategy, action));
        Ok(action)
    }

    async fn resolve_both_added(
        &self,
        path: &str,
        strategy: ResolutionStrategy,
    ) -> Result<ResolutionAction, GitError> {
        let action = if self.is_binary(path).await {
            debug!(path, "binary add/add conflict, using checkout");
            self.checkout(path, strategy).await?;
            ResolutionAction::CheckedOut
        } else {
            let spec = format!(":{}:{}", strategy.index_stage(), path);
            let blob = self.runner.run_raw(&["show", &spec]).await?;
            self.write_worktree_file(path, &blob).await?;
            ResolutionAction::Reconstructed
        };
        self.stage(path).await?;
        Ok(action)
    }

    /// Decide whether `path` holds binary content: numstat first, then the
    /// `binary` attribute, then the extension list.
    pub async fn is_binary(&self, path: &str) -> bool {
        match self
            .runner
            .run(&["diff", "--numstat", "HEAD", "--", path])
            .await
        {
            Ok(out) if numstat_reports_binary(&out) => return true,
            Ok(_) => {}
            Err(e) => {
                debug!(path, error = %e, "numstat failed, falling back to extension");
                return has_extension(path, FALLBACK_BINARY_EXTENSIONS);
            }
        }

        match self
            .runner
            .run(&["check-attr", "binary", "--", path])
            .await
        {
            Ok(out) if check_attr_reports_binary(&out) => return true,
            Ok(_) => {}
            Err(e) => {
                debug!(path, error = %e, "check-attr failed, falling back to extension");
                return has_extension(path, FALLBACK_BINARY_EXTENSIONS);
            }
        }

        has_extension(path, BINARY_EXTENSIONS)
    }

    async fn checkout(&self, path: &str, strategy: ResolutionStrategy) -> Result<(), GitError> {
        self.runner
            .run(&["checkout", strategy.checkout_flag(), "--", path])
            .await?;
        Ok(())
    }

    async fn stage(&self, path: &str) -> Result<(), GitError> {
        self.runner.run(&["add", "--", path]).await?;
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), GitError> {
        self.runner.run(&["rm", "--", path]).await?;
        Ok(())
    }

    async fn write_worktree_file(&self, path: &str, contents: &[u8]) -> Result<(), GitError> {
        let full = self.runner.work_dir().join(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, contents).await?;
        info!(path, bytes = contents.len(), "wrote side blob to working tree");
        Ok(())
    }
}

fn has_extension(path: &str, extensions: &[&str]) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .is_some_and(|ext| extensions.contains(&ext.as_str()))
}

fn describe(file: &ConflictedFile, strategy: ResolutionStrategy, action: ResolutionAction) -> String {
    let path = &file.path;
    match (file.kind, action) {
        (ConflictKind::DeletedByBoth, _) => {
            format!("Resolved {path} by accepting deletion on both sides")
        }
        (ConflictKind::DeletedByUs, ResolutionAction::Removed) => {
            format!("Resolved {path} by keeping deletion ({strategy})")
        }
        (ConflictKind::DeletedByThem, ResolutionAction::Removed) => {
            format!("Resolved {path} by accepting deletion ({strategy})")
        }
        (ConflictKind::AddedByUs | ConflictKind::AddedByThem, ResolutionAction::Removed) => {
            format!("Resolved {path} by dropping the one-sided addition ({strategy})")
        }
        (_, ResolutionAction::Kept) => format!("Resolved {path} by keeping file ({strategy})"),
        _ => format!("Resolved {path} using {strategy} strategy"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::git::fake::FakeGit;
    use crate::observer::recording::{Level, RecordingObserver};

    fn executor(
        fake: FakeGit,
    ) -> (
        ResolutionExecutor<Arc<FakeGit>>,
        Arc<FakeGit>,
        Arc<RecordingObserver>,
    ) {
        let fake = Arc::new(fake);
        let observer = Arc::new(RecordingObserver::default());
        let exec = ResolutionExecutor::new(Arc::clone(&fake), observer.clone());
        (exec, fake, observer)
    }

    async fn run_case(
        kind: ConflictKind,
        strategy: ResolutionStrategy,
    ) -> (ResolutionAction, Vec<String>) {
        let (exec, fake, _) = executor(FakeGit::new("/repo"));
        let action = exec
            .resolve(&ConflictedFile::new("f.txt", kind), strategy)
            .await
            .unwrap();
        (action, fake.calls())
    }

    #[tokio::test]
    async fn test_both_modified_checks_out_and_stages() {
        let (action, calls) = run_case(ConflictKind::BothModified, ResolutionStrategy::Ours).await;
        assert_eq!(action, ResolutionAction::CheckedOut);
        assert_eq!(calls, vec!["checkout --ours -- f.txt", "add -- f.txt"]);

        let (_, calls) = run_case(ConflictKind::BothModified, ResolutionStrategy::Theirs).await;
        assert_eq!(calls, vec!["checkout --theirs -- f.txt", "add -- f.txt"]);
    }

    #[tokio::test]
    async fn test_deleted_by_us() {
        let (action, calls) = run_case(ConflictKind::DeletedByUs, ResolutionStrategy::Ours).await;
        assert_eq!(action, ResolutionAction::Removed);
        assert_eq!(calls, vec!["rm -- f.txt"]);

        let (action, calls) = run_case(ConflictKind::DeletedByUs, ResolutionStrategy::Theirs).await;
        assert_eq!(action, ResolutionAction::Kept);
        assert_eq!(calls, vec!["add -- f.txt"]);
    }

    #[tokio::test]
    async fn test_deleted_by_them() {
        let (action, calls) = run_case(ConflictKind::DeletedByThem, ResolutionStrategy::Ours).await;
        assert_eq!(action, ResolutionAction::Kept);
        assert_eq!(calls, vec!["add -- f.txt"]);

        let (action, calls) =
            run_case(ConflictKind::DeletedByThem, ResolutionStrategy::Theirs).await;
        assert_eq!(action, ResolutionAction::Removed);
        assert_eq!(calls, vec!["rm -- f.txt"]);
    }

    #[tokio::test]
    async fn test_deleted_by_both_ignores_strategy() {
        for strategy in [ResolutionStrategy::Ours, ResolutionStrategy::Theirs] {
            let (action, calls) = run_case(ConflictKind::DeletedByBoth, strategy).await;
            assert_eq!(action, ResolutionAction::Removed);
            assert_eq!(calls, vec!["rm -- f.txt"]);
        }
    }

    #[tokio::test]
    async fn test_added_by_one_side() {
        let (_, calls) = run_case(ConflictKind::AddedByUs, ResolutionStrategy::Ours).await;
        assert_eq!(calls, vec!["add -- f.txt"]);
        let (_, calls) = run_case(ConflictKind::AddedByUs, ResolutionStrategy::Theirs).await;
        assert_eq!(calls, vec!["rm -- f.txt"]);
        let (_, calls) = run_case(ConflictKind::AddedByThem, ResolutionStrategy::Ours).await;
        assert_eq!(calls, vec!["rm -- f.txt"]);
        let (_, calls) = run_case(ConflictKind::AddedByThem, ResolutionStrategy::Theirs).await;
        assert_eq!(calls, vec!["add -- f.txt"]);
    }

    #[tokio::test]
    async fn test_both_added_text_reconstructs_from_stage_blob() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.md"), "<<<<<<< HEAD\nours\n=======\ntheirs\n>>>>>>>\n")
            .unwrap();
        let fake = FakeGit::new(dir.path());
        fake.respond("diff --numstat HEAD -- notes.md", "2\t0\tnotes.md\n");
        fake.respond("check-attr binary -- notes.md", "notes.md: binary: unspecified\n");
        fake.respond("show :3:notes.md", "theirs\n");
        let (exec, fake, _) = executor(fake);

        let action = exec
            .resolve(
                &ConflictedFile::new("notes.md", ConflictKind::BothAdded),
                ResolutionStrategy::Theirs,
            )
            .await
            .unwrap();

        assert_eq!(action, ResolutionAction::Reconstructed);
        assert_eq!(
            fake.calls(),
            vec![
                "diff --numstat HEAD -- notes.md",
                "check-attr binary -- notes.md",
                "show :3:notes.md",
                "add -- notes.md",
            ]
        );
        let written = std::fs::read_to_string(dir.path().join("notes.md")).unwrap();
        assert_eq!(written, "theirs\n");
    }

    #[tokio::test]
    async fn test_both_added_ours_uses_stage_two() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeGit::new(dir.path());
        fake.respond("show :2:src/new.rs", "fn ours() {}\n");
        let (exec, fake, _) = executor(fake);

        exec.resolve(
            &ConflictedFile::new("src/new.rs", ConflictKind::BothAdded),
            ResolutionStrategy::Ours,
        )
        .await
        .unwrap();

        assert!(fake.calls().contains(&"show :2:src/new.rs".to_string()));
        let written = std::fs::read_to_string(dir.path().join("src/new.rs")).unwrap();
        assert_eq!(written, "fn ours() {}\n");
    }

    #[tokio::test]
    async fn test_both_added_binary_by_numstat_uses_checkout() {
        let fake = FakeGit::new("/repo");
        fake.respond("diff --numstat HEAD -- data.blob", "-\t-\tdata.blob\n");
        let (exec, fake, _) = executor(fake);

        let action = exec
            .resolve(
                &ConflictedFile::new("data.blob", ConflictKind::BothAdded),
                ResolutionStrategy::Ours,
            )
            .await
            .unwrap();

        assert_eq!(action, ResolutionAction::CheckedOut);
        assert_eq!(
            fake.calls(),
            vec![
                "diff --numstat HEAD -- data.blob",
                "checkout --ours -- data.blob",
                "add -- data.blob",
            ]
        );
    }

    #[tokio::test]
    async fn test_binary_detection_by_attribute_and_extension() {
        let fake = FakeGit::new("/repo");
        fake.respond("check-attr binary -- model.weights", "model.weights: binary: set\n");
        let (exec, _, _) = executor(fake);

        assert!(exec.is_binary("model.weights").await);
        assert!(exec.is_binary("assets/Logo.PNG").await);
        assert!(exec.is_binary("bundle.zip").await);
        assert!(!exec.is_binary("src/main.rs").await);
        assert!(!exec.is_binary("Makefile").await);
    }

    #[tokio::test]
    async fn test_binary_detection_git_failure_uses_short_list() {
        let fake = FakeGit::new("/repo");
        fake.fail("diff --numstat HEAD -- icon.ico");
        fake.fail("diff --numstat HEAD -- archive.zip");
        let (exec, _, _) = executor(fake);

        assert!(exec.is_binary("icon.ico").await);
        assert!(!exec.is_binary("archive.zip").await);
    }

    #[tokio::test]
    async fn test_command_failure_propagates_and_stops() {
        let fake = FakeGit::new("/repo");
        fake.fail("checkout --theirs -- broken.rs");
        let (exec, fake, observer) = executor(fake);

        let result = exec
            .resolve(
                &ConflictedFile::new("broken.rs", ConflictKind::BothModified),
                ResolutionStrategy::Theirs,
            )
            .await;

        match result {
            Err(GitError::CommandFailed { command, .. }) => {
                assert_eq!(command, "checkout --theirs -- broken.rs")
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
        assert_eq!(fake.calls(), vec!["checkout --theirs -- broken.rs"]);
        assert!(observer.messages(Level::Info).is_empty());
    }

    #[tokio::test]
    async fn test_success_reported_to_observer() {
        let (exec, _, observer) = executor(FakeGit::new("/repo"));
        exec.resolve(
            &ConflictedFile::new("old.txt", ConflictKind::DeletedByUs),
            ResolutionStrategy::Ours,
        )
        .await
        .unwrap();

        assert_eq!(
            observer.messages(Level::Info),
            vec!["Resolved old.txt by keeping deletion (ours)"]
        );
    }

    #[test]
    fn test_action_labels() {
        assert_eq!(ResolutionAction::CheckedOut.label(), "checkout");
        assert_eq!(ResolutionAction::Removed.label(), "remove");
    }
}
