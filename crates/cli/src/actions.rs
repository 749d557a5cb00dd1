//! GitHub Actions integration: workflow annotations and step outputs.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use conflict_resolver_core::observer::Observer;
use conflict_resolver_core::resolver::ResolutionResult;

/// `true` when running inside a GitHub Actions job.
pub fn in_github_actions() -> bool {
    std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true")
}

/// Escape a message for use in a `::warning::` / `::error::` command.
pub fn escape_annotation(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

/// Turns warnings and errors into workflow annotations so they show up on
/// the run summary. Info messages go to the log as usual.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowObserver;

impl Observer for WorkflowObserver {
    fn info(&self, message: &str) {
        info!("{message}");
    }

    fn warn(&self, message: &str) {
        println!("::warning::{}", escape_annotation(message));
    }

    fn error(&self, message: &str) {
        println!("::error::{}", escape_annotation(message));
    }
}

// ---------------------------------------------------------------------------
// Step outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum OutputTarget {
    File(PathBuf),
    Stdout,
}

/// Writes named step outputs to `$GITHUB_OUTPUT`, or to stdout when the
/// variable is not set.
#[derive(Debug, Clone)]
pub struct ActionOutputs {
    target: OutputTarget,
}

impl ActionOutputs {
    pub fn from_env() -> Self {
        match std::env::var_os("GITHUB_OUTPUT") {
            Some(path) if !path.is_empty() => Self::to_file(path),
            _ => Self::stdout(),
        }
    }

    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            target: OutputTarget::File(path.into()),
        }
    }

    pub fn stdout() -> Self {
        Self {
            target: OutputTarget::Stdout,
        }
    }

    /// Set a single output.
    pub fn set(&self, name: &str, value: &str) -> Result<()> {
        let entry = format_output(name, value);
        match &self.target {
            OutputTarget::Stdout => print!("{entry}"),
            OutputTarget::File(path) => {
                let mut file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("failed to open {}", path.display()))?;
                file.write_all(entry.as_bytes())
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
        }
        Ok(())
    }

    /// Publish the four outputs of a resolution pass.
    pub fn write_result(&self, result: &ResolutionResult) -> Result<()> {
        self.set("resolved-files", &result.resolved_files.join(","))?;
        self.set("unresolved-files", &result.unresolved_files.join(","))?;
        self.set("resolved-count", &result.resolved_files.len().to_string())?;
        self.set("unresolved-count", &result.unresolved_files.len().to_string())?;
        Ok(())
    }
}

/// `name=value`, or the heredoc form when the value spans lines.
fn format_output(name: &str, value: &str) -> String {
    if !value.contains('\n') && !value.contains('\r') {
        return format!("{name}={value}\n");
    }
    let mut delimiter = String::from("__CONFLICT_RESOLVER_EOF__");
    while value.contains(&delimiter) {
        delimiter.push('_');
    }
    format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
}
