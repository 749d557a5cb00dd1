//! End-to-end resolution pass.
//!
//! [`ConflictResolver`] loads the rules, asks the conflict source whether a
//! merge or rebase is in progress, and then walks the conflicted files in
//! the order they were reported: match, execute, record. A failure on one
//! file never stops the pass; only failures of the sources themselves are
//! fatal.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::config::RuleSet;
use crate::conflict::{
    ConflictedFile, ResolutionExecutor, ResolutionRule, ResolutionStrategy, RuleMatcher,
};
use crate::errors::{ConfigError, CoreError, GitError};
use crate::git::{CommandRunner, GitCli, GitRepository, RepoState};
use crate::observer::SharedObserver;

// ---------------------------------------------------------------------------
// Collaborator seams
// ---------------------------------------------------------------------------

/// Supplies the ordered rule list for a pass.
pub trait RuleSource {
    fn load_rules(&self) -> Result<RuleSet, ConfigError>;
}

/// Supplies repository state and the conflicted files.
#[allow(async_fn_in_trait)]
pub trait ConflictSource {
    async fn detect_state(&self) -> Result<RepoState, GitError>;
    async fn list_conflicts(&self) -> Result<Vec<ConflictedFile>, GitError>;
}

impl RuleSource for RuleSet {
    fn load_rules(&self) -> Result<RuleSet, ConfigError> {
        Ok(self.clone())
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of one pass. Both lists keep the order files were reported in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionResult {
    pub resolved_files: Vec<String>,
    pub unresolved_files: Vec<String>,
}

impl ResolutionResult {
    pub fn is_empty(&self) -> bool {
        self.resolved_files.is_empty() && self.unresolved_files.is_empty()
    }

    pub fn has_unresolved(&self) -> bool {
        !self.unresolved_files.is_empty()
    }
}

/// What a pass would do for one file, without touching the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedResolution {
    pub file: ConflictedFile,
    pub strategy: Option<ResolutionStrategy>,
    pub rule: Option<ResolutionRule>,
}

/// Dry-run view of a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionPlan {
    pub state: RepoState,
    pub entries: Vec<PlannedResolution>,
}

impl ResolutionPlan {
    pub fn matched(&self) -> usize {
        self.entries.iter().filter(|e| e.strategy.is_some()).count()
    }

    pub fn unmatched(&self) -> usize {
        self.entries.len() - self.matched()
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Drives a full resolution pass.
pub struct ConflictResolver<S, C, R> {
    rules: S,
    conflicts: C,
    executor: ResolutionExecutor<R>,
    observer: SharedObserver,
}

impl<S: RuleSource> ConflictResolver<S, GitRepository<Arc<GitCli>>, Arc<GitCli>> {
    /// Wire a resolver against a real working tree.
    pub fn for_git(rules: S, git: GitCli, observer: SharedObserver) -> Self {
        let git = Arc::new(git);
        Self::new(
            rules,
            GitRepository::new(Arc::clone(&git)),
            git,
            observer,
        )
    }
}

impl<S, C, R> ConflictResolver<S, C, R>
where
    S: RuleSource,
    C: ConflictSource,
    R: CommandRunner,
{
    pub fn new(rules: S, conflicts: C, runner: R, observer: SharedObserver) -> Self {
        let executor = ResolutionExecutor::new(runner, Arc::clone(&observer));
        Self {
            rules,
            conflicts,
            executor,
            observer,
        }
    }

    pub fn conflict_source(&self) -> &C {
        &self.conflicts
    }

    /// Run the pass. Returns an error only if the rule source or the
    /// conflict source fails.
    #[instrument(skip_all)]
    pub async fn resolve(&self) -> Result<ResolutionResult, CoreError> {
        let Some((rule_set, files)) = self.gather().await? else {
            return Ok(ResolutionResult::default());
        };

        let matcher = rule_set.matcher();
        let mut result = ResolutionResult::default();

        for file in &files {
            let Some(rule) = matcher.find_matching_rule(file, &rule_set.rules) else {
                self.observer.info(&format!(
                    "No rule matches {} ({}), leaving it for manual resolution",
                    file.path, file.kind
                ));
                result.unresolved_files.push(file.path.clone());
                continue;
            };

            if let Some(description) = &rule.description {
                self.observer.info(&format!("Applying rule: {description}"));
            }

            match self.executor.resolve(file, rule.strategy).await {
                Ok(action) => {
                    debug!(path = %file.path, action = action.label(), "file resolved");
                    result.resolved_files.push(file.path.clone());
                }
                Err(e) => {
                    self.observer
                        .error(&format!("Failed to resolve {}: {e}", file.path));
                    result.unresolved_files.push(file.path.clone());
                }
            }
        }

        self.summarize(&result);
        Ok(result)
    }

    /// Match every conflicted file without executing anything.
    #[instrument(skip_all)]
    pub async fn plan(&self) -> Result<ResolutionPlan, CoreError> {
        let rule_set = self.rules.load_rules()?;
        let state = self.conflicts.detect_state().await?;
        if !state.has_pending_conflicts() {
            return Ok(ResolutionPlan {
                state,
                entries: Vec::new(),
            });
        }

        let files = self.conflicts.list_conflicts().await?;
        let matcher = rule_set.matcher();
        let entries = files
            .into_iter()
            .map(|file| plan_entry(&matcher, file, &rule_set.rules))
            .collect();

        Ok(ResolutionPlan { state, entries })
    }

    /// Load rules and conflicts. `None` means there is nothing to do.
    async fn gather(&self) -> Result<Option<(RuleSet, Vec<ConflictedFile>)>, CoreError> {
        let rule_set = self.rules.load_rules()?;
        if rule_set.is_empty() {
            self.observer
                .warn("No resolution rules configured, every conflict will need manual resolution");
        }

        let state = self.conflicts.detect_state().await?;
        if !state.has_pending_conflicts() {
            self.observer
                .info("Not in a merge or rebase state, nothing to resolve");
            return Ok(None);
        }

        let files = self.conflicts.list_conflicts().await?;
        if files.is_empty() {
            self.observer.info("No conflicted files found");
            return Ok(None);
        }

        info!(
            files = files.len(),
            rules = rule_set.len(),
            in_merge = state.in_merge,
            in_rebase = state.in_rebase,
            "starting resolution pass"
        );
        self.observer
            .info(&format!("Found {} conflicted file(s)", files.len()));
        Ok(Some((rule_set, files)))
    }

    fn summarize(&self, result: &ResolutionResult) {
        self.observer.info(&format!(
            "Resolved {} file(s), {} left unresolved",
            result.resolved_files.len(),
            result.unresolved_files.len()
        ));
        if result.has_unresolved() {
            self.observer.warn(&format!(
                "Manual resolution required for: {}",
                result.unresolved_files.join(", ")
            ));
        }
    }
}

fn plan_entry(
    matcher: &RuleMatcher,
    file: ConflictedFile,
    rules: &[ResolutionRule],
) -> PlannedResolution {
    let rule = matcher.find_matching_rule(&file, rules).cloned();
    PlannedResolution {
        strategy: rule.as_ref().map(|r| r.strategy),
        rule,
        file,
    }
}
