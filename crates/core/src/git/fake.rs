//! Scripted [`CommandRunner`] for unit tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::runner::CommandRunner;
use crate::errors::GitError;

/// Records every command and answers from a script keyed by the joined
/// argument list. Unscripted commands succeed with empty stdout.
#[derive(Debug, Default)]
pub(crate) struct FakeGit {
    work_dir: PathBuf,
    calls: Mutex<Vec<String>>,
    script: Mutex<HashMap<String, Result<Vec<u8>, String>>>,
}

impl FakeGit {
    pub(crate) fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            ..Default::default()
        }
    }

    pub(crate) fn respond(&self, command: &str, stdout: impl Into<Vec<u8>>) {
        self.script
            .lock()
            .unwrap()
            .insert(command.to_string(), Ok(stdout.into()));
    }

    pub(crate) fn fail(&self, command: &str) {
        self.script
            .lock()
            .unwrap()
            .insert(command.to_string(), Err(format!("fatal: {command} failed")));
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for FakeGit {
    fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    async fn run_raw(&self, args: &[&str]) -> Result<Vec<u8>, GitError> {
        let command = args.join(" ");
        self.calls.lock().unwrap().push(command.clone());
        match self.script.lock().unwrap().get(&command) {
            Some(Ok(stdout)) => Ok(stdout.clone()),
            Some(Err(stderr)) => Err(GitError::command_failed(args, 1, stderr.clone())),
            None => Ok(Vec::new()),
        }
    }
}
