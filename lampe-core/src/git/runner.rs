//! Child-process seam for git invocations.
//!
//! `GitRunner` is an enum (no trait objects): the system runner shells out
//! via `tokio::process`, the scripted runner replays canned outputs for
//! unit tests. Each call carries a timeout; cancellation propagates by
//! killing the child when the future is dropped.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tracing::{debug, trace};

use crate::errors::GitError;
use crate::git::encoding::sanitize_utf8;

const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(120);

/// Captured result of one git invocation.
#[derive(Debug, Clone)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
    /// Process exit code; -1 when terminated by signal.
    pub status: i32,
}

impl GitOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            status: 0,
        }
    }

    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            status,
        }
    }

    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Runner dispatch. The scripted variant replays canned outputs and exists
/// for tests; production code paths only construct the system runner.
#[derive(Debug, Clone)]
pub enum GitRunner {
    System(SystemGit),
    Scripted(ScriptedGit),
}

impl Default for GitRunner {
    fn default() -> Self {
        Self::System(SystemGit {
            timeout: DEFAULT_GIT_TIMEOUT,
        })
    }
}

impl GitRunner {
    /// Runs `git <args>` in `cwd` and captures output.
    ///
    /// A non-zero exit is not an error at this level; callers decide which
    /// statuses are recoverable (e.g. `git grep` exits 1 on no matches).
    pub async fn run(&self, cwd: &Path, args: &[&str]) -> Result<GitOutput, GitError> {
        match self {
            Self::System(s) => s.run(cwd, args).await,
            Self::Scripted(s) => s.run(args),
        }
    }
}

/// Real subprocess runner.
#[derive(Debug, Clone)]
pub struct SystemGit {
    timeout: Duration,
}

impl SystemGit {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn run(&self, cwd: &Path, args: &[&str]) -> Result<GitOutput, GitError> {
        trace!(?args, cwd = %cwd.display(), "spawning git");
        let child = tokio::process::Command::new("git")
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| GitError::Timeout(args.join(" ")))??;

        let out = GitOutput {
            stdout: sanitize_utf8(&output.stdout),
            stderr: sanitize_utf8(&output.stderr),
            status: output.status.code().unwrap_or(-1),
        };
        trace!(status = out.status, stdout_len = out.stdout.len(), "git finished");
        Ok(out)
    }
}

/// Scripted runner for unit tests: canned output per argument vector.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGit {
    responses: std::collections::HashMap<String, GitOutput>,
}

impl ScriptedGit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, args: &str, output: GitOutput) -> Self {
        self.responses.insert(args.to_string(), output);
        self
    }

    fn run(&self, args: &[&str]) -> Result<GitOutput, GitError> {
        let key = args.join(" ");
        Ok(self
            .responses
            .get(&key)
            .cloned()
            .unwrap_or_else(|| GitOutput::failed(128, format!("scripted: no response for `git {key}`"))))
    }
}

/// Handle to a local clone; all inspector operations hang off this type.
#[derive(Debug, Clone)]
pub struct GitInspector {
    repo_path: PathBuf,
    runner: GitRunner,
}

impl GitInspector {
    /// Inspector over the clone at `repo_path` using the system git.
    pub fn open(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
            runner: GitRunner::default(),
        }
    }

    /// Inspector with an injected runner (used by tests).
    pub fn with_runner(repo_path: impl Into<PathBuf>, runner: GitRunner) -> Self {
        Self {
            repo_path: repo_path.into(),
            runner,
        }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Raw invocation; callers interpret the status.
    pub(crate) async fn git(&self, args: &[&str]) -> Result<GitOutput, GitError> {
        self.runner.run(&self.repo_path, args).await
    }

    /// Invocation that treats any non-zero status as an error.
    pub(crate) async fn git_ok(&self, args: &[&str]) -> Result<String, GitError> {
        let out = self.git(args).await?;
        if out.success() {
            Ok(out.stdout)
        } else {
            debug!(status = out.status, stderr = %out.stderr, "git command failed");
            Err(GitError::Subprocess {
                command: args.join(" "),
                status: out.status,
                stderr: out.stderr,
            })
        }
    }
}
