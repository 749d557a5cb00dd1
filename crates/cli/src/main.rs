//! Conflict resolver command-line entry point.
//!
//! Runs as a GitHub Actions step (or locally) against a repository that is
//! in the middle of a merge or rebase, resolving conflicted files from the
//! rules file and publishing the resolved/unresolved lists as step outputs.
//! Also provides subcommands for a dry run, validating the rules file and
//! generating a sample one.

mod actions;
mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use tracing_subscriber::EnvFilter;

use conflict_resolver_core::config::{RulesFile, DEFAULT_CONFIG_PATH, SAMPLE_CONFIG};
use conflict_resolver_core::git::{GitCli, GitRepository};
use conflict_resolver_core::observer::{SharedObserver, TracingObserver};
use conflict_resolver_core::resolver::{ConflictResolver, ResolutionPlan, ResolutionResult};

use actions::{ActionOutputs, WorkflowObserver};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Rule-driven merge and rebase conflict resolver.
///
/// Options that double as workflow-action inputs fall back to their
/// environment variable; an empty variable counts as unset.
#[derive(Parser, Debug)]
#[command(
    name = "conflict-resolver",
    version,
    about = "Resolve git merge and rebase conflicts from declarative rules"
)]
struct Cli {
    /// Path to the rules file, relative to the repository. Falls back to
    /// $INPUT_CONFIG-PATH, then .github/conflict-resolver.yml.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Repository working tree. Falls back to $GITHUB_WORKSPACE, then ".".
    #[arg(long, global = true)]
    repo: Option<PathBuf>,

    /// Commit the merge when every conflict was resolved. Falls back to
    /// $INPUT_COMMIT-MESSAGE.
    #[arg(long, global = true)]
    commit_message: Option<String>,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Resolve conflicts in the working tree (default).
    Resolve,

    /// Show what each conflicted file would resolve to without changing anything.
    Check {
        /// Print the plan as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Validate the rules file.
    Validate,

    /// Write a sample rules file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

const CONFIG_PATH_INPUT: &str = "INPUT_CONFIG-PATH";
const WORKSPACE_INPUT: &str = "GITHUB_WORKSPACE";
const COMMIT_MESSAGE_INPUT: &str = "INPUT_COMMIT-MESSAGE";

/// Effective inputs after applying flags, environment and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Inputs {
    repo: PathBuf,
    config: PathBuf,
    commit_message: Option<String>,
}

impl Inputs {
    fn from_cli(cli: &Cli) -> Self {
        Self::resolve(cli, |name| std::env::var(name).ok())
    }

    /// A flag wins over its variable; empty values from either are ignored.
    fn resolve(cli: &Cli, env: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |value: &String| !value.trim().is_empty();
        let input = |flag: Option<String>, name: &str| {
            flag.filter(non_empty).or_else(|| env(name).filter(non_empty))
        };
        let path_flag = |flag: &Option<PathBuf>| {
            flag.as_ref().map(|p| p.to_string_lossy().into_owned())
        };

        let repo = PathBuf::from(
            input(path_flag(&cli.repo), WORKSPACE_INPUT).unwrap_or_else(|| ".".to_string()),
        );
        let config = PathBuf::from(
            input(path_flag(&cli.config), CONFIG_PATH_INPUT)
                .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string()),
        );
        Self {
            config: config_path(&repo, &config),
            repo,
            commit_message: input(cli.commit_message.clone(), COMMIT_MESSAGE_INPUT),
        }
    }
}

/// Resolved locations shared by every subcommand.
struct Workspace {
    inputs: Inputs,
    observer: SharedObserver,
}

impl Workspace {
    fn new(inputs: Inputs) -> Self {
        let observer: SharedObserver = if actions::in_github_actions() {
            Arc::new(WorkflowObserver)
        } else {
            TracingObserver::shared()
        };
        Self { inputs, observer }
    }

    fn resolver(&self) -> ConflictResolver<RulesFile, GitRepository<Arc<GitCli>>, Arc<GitCli>> {
        ConflictResolver::for_git(
            RulesFile::new(&self.inputs.config),
            GitCli::new(&self.inputs.repo),
            Arc::clone(&self.observer),
        )
    }
}

/// Relative config paths are taken from the repository root.
fn config_path(repo: &Path, config: &Path) -> PathBuf {
    if config.is_absolute() {
        config.to_path_buf()
    } else {
        repo.join(config)
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = format!("{e:#}");
            if actions::in_github_actions() {
                println!("::error::{}", actions::escape_annotation(&message));
            } else {
                eprintln!("{}", style::error(&message));
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let workspace = Workspace::new(Inputs::from_cli(&cli));
    match cli.command.unwrap_or(Commands::Resolve) {
        Commands::Resolve => cmd_resolve(&workspace).await,
        Commands::Check { json } => cmd_check(&workspace, json).await,
        Commands::Validate => cmd_validate(&workspace.inputs.config),
        Commands::Init { force } => cmd_init(&workspace.inputs.config, force),
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

async fn cmd_resolve(workspace: &Workspace) -> Result<()> {
    let resolver = workspace.resolver();
    let result = resolver
        .resolve()
        .await
        .context("conflict resolution failed")?;

    if !actions::in_github_actions() {
        print_result(&result);
    }
    ActionOutputs::from_env()
        .write_result(&result)
        .context("failed to write step outputs")?;

    let Some(message) = workspace.inputs.commit_message.as_deref() else {
        return Ok(());
    };
    if result.has_unresolved() {
        workspace
            .observer
            .warn("Not committing: some conflicts still need manual resolution");
    } else if !result.resolved_files.is_empty() {
        resolver
            .conflict_source()
            .commit(message)
            .await
            .context("failed to commit resolution")?;
        workspace.observer.info("Committed resolved conflicts");
    }
    Ok(())
}

async fn cmd_check(workspace: &Workspace, json: bool) -> Result<()> {
    let plan = workspace
        .resolver()
        .plan()
        .await
        .context("failed to inspect conflicts")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&plan).context("failed to serialize plan")?
        );
        return Ok(());
    }

    print_plan(&plan);
    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating rules file: {}", config_path.display());
    println!();

    let rule_set = RulesFile::new(config_path)
        .load_required()
        .context("rules file is invalid")?;

    println!("{}", style::success("Structure is valid"));
    println!(
        "{}",
        style::success(&format!("{} rule(s) defined", rule_set.len()))
    );
    println!(
        "  Rename fallout: {}",
        style::dim(&format!("{:?}", rule_set.rename_fallout).to_lowercase())
    );

    if rule_set.is_empty() {
        println!();
        println!(
            "{}",
            style::warn("No rules defined, every conflict will need manual resolution")
        );
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "Paths", "Conflict type", "Strategy", "Description"]);
    for (index, rule) in rule_set.rules.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index),
            Cell::new(&rule.path_pattern),
            Cell::new(rule.kind.map_or_else(|| "any".to_string(), |k| k.to_string())),
            Cell::new(style::strategy(Some(rule.strategy))),
            Cell::new(rule.description.as_deref().unwrap_or("")),
        ]);
    }

    println!();
    println!("{table}");
    Ok(())
}

fn cmd_init(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "file already exists: {}. Use --force to overwrite it.",
            output.display()
        );
    }

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(output, SAMPLE_CONFIG).context("failed to write rules file")?;

    println!(
        "{}",
        style::success(&format!("Sample rules written to {}", output.display()))
    );
    println!();
    println!("Next steps:");
    println!("  1. Edit the rules to match the files your merges conflict on");
    println!(
        "  2. Validate with: conflict-resolver validate --config {}",
        output.display()
    );
    println!("  3. Preview during a conflicted merge with: conflict-resolver check");

    Ok(())
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

fn print_result(result: &ResolutionResult) {
    if result.is_empty() {
        println!("{}", style::dim("No conflicts to resolve."));
        return;
    }
    for path in &result.resolved_files {
        println!("{}", style::success(path));
    }
    for path in &result.unresolved_files {
        println!("{}", style::warn(&format!("{path} needs manual resolution")));
    }
    println!();
}

fn print_plan(plan: &ResolutionPlan) {
    if !plan.state.has_pending_conflicts() {
        println!("{}", style::dim("Not in a merge or rebase, nothing to check."));
        return;
    }
    if plan.entries.is_empty() {
        println!("{}", style::success("No conflicted files"));
        return;
    }

    println!();
    println!(
        "{}",
        style::header(&format!("Conflicted Files ({})", plan.entries.len()))
    );
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["File", "Conflict type", "Strategy", "Rule"]);
    for entry in &plan.entries {
        let rule = entry
            .rule
            .as_ref()
            .map(|r| match &r.description {
                Some(desc) => format!("{} ({desc})", r.path_pattern),
                None => r.path_pattern.clone(),
            })
            .unwrap_or_else(|| "—".to_string());
        table.add_row(vec![
            Cell::new(&entry.file.path),
            Cell::new(entry.file.kind),
            Cell::new(style::strategy(entry.strategy)),
            Cell::new(rule),
        ]);
    }

    println!("{table}");
    println!();
    println!(
        "{} will be resolved, {} need manual resolution",
        plan.matched(),
        plan.unmatched()
    );
}
