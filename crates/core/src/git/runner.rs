//! The single narrow capability for talking to git.
//!
//! Every git invocation in the crate goes through [`CommandRunner`], so the
//! executor and the conflict source can be driven by a scripted fake in
//! tests.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tracing::debug;

use crate::errors::GitError;

/// Runs `git` subcommands inside one working tree.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Root of the working tree the commands operate on.
    fn work_dir(&self) -> &Path;

    /// Run `git <args>` and return raw stdout. Non-zero exit is an error.
    async fn run_raw(&self, args: &[&str]) -> Result<Vec<u8>, GitError>;

    /// Run `git <args>` and return stdout as (lossy) UTF-8.
    async fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let stdout = self.run_raw(args).await?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

impl<T: CommandRunner> CommandRunner for Arc<T> {
    fn work_dir(&self) -> &Path {
        (**self).work_dir()
    }

    async fn run_raw(&self, args: &[&str]) -> Result<Vec<u8>, GitError> {
        (**self).run_raw(args).await
    }
}

/// [`CommandRunner`] backed by the `git` binary.
#[derive(Debug, Clone)]
pub struct GitCli {
    work_dir: PathBuf,
    binary: String,
}

impl GitCli {
    /// Create a runner for the working tree at `work_dir`.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            binary: "git".into(),
        }
    }

    /// Use a different git executable (e.g. an absolute path).
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }
}

impl CommandRunner for GitCli {
    fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    async fn run_raw(&self, args: &[&str]) -> Result<Vec<u8>, GitError> {
        let mut cmd = Command::new(&self.binary);
        cmd.current_dir(&self.work_dir)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(cmd = %format!("git {}", args.join(" ")), "running git command");
        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GitError::BinaryNotFound(self.binary.clone())
            } else {
                GitError::IoError(e)
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let exit_code = output.status.code().unwrap_or(-1);
            debug!(exit_code, %stderr, cmd = %args.join(" "), "git command exited non-zero");
            return Err(GitError::command_failed(args, exit_code, stderr));
        }
        Ok(output.stdout)
    }
}
