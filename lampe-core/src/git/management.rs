//! Clone management and partial-clone safety.
//!
//! Clones are created with partial-clone optimizations (shallow, sparse
//! checkout, blob filtering) so only required content is fetched. Before an
//! operation dereferences commits in such a clone, the
//! [`LocalCommitsAvailability`] guard fetches any that are missing.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::GitError;
use crate::git::runner::{GitInspector, GitRunner};

/// Git 2.49.0+ required for `clone --revision` support.
pub const MINIMUM_GIT_VERSION: &str = "2.49.0";

/// Parses `git version` output into (major, minor, patch).
///
/// Tolerates platform suffixes like `2.49.0.windows.1`.
pub fn parse_git_version(version_line: &str) -> Option<(u32, u32, u32)> {
    let token = version_line.split_whitespace().nth(2)?;
    let mut parts = token.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    Some((major, minor, patch))
}

fn version_meets(found: (u32, u32, u32), required: (u32, u32, u32)) -> bool {
    found >= required
}

/// Checks that the installed git meets [`MINIMUM_GIT_VERSION`].
///
/// # Errors
/// [`GitError::Version`] when git is too old or the version output cannot
/// be parsed.
pub async fn check_git_version() -> Result<(), GitError> {
    let runner = GitRunner::default();
    let out = runner.run(Path::new("."), &["version"]).await?;
    if !out.success() {
        return Err(GitError::Subprocess {
            command: "version".into(),
            status: out.status,
            stderr: out.stderr,
        });
    }
    let found = parse_git_version(&out.stdout).ok_or_else(|| GitError::Version {
        found: out.stdout.trim().to_string(),
        required: MINIMUM_GIT_VERSION,
    })?;
    if version_meets(found, (2, 49, 0)) {
        debug!(version = %out.stdout.trim(), "git version meets requirement");
        Ok(())
    } else {
        Err(GitError::Version {
            found: format!("{}.{}.{}", found.0, found.1, found.2),
            required: MINIMUM_GIT_VERSION,
        })
    }
}

/// Options for [`clone_repo`].
#[derive(Debug, Clone)]
pub struct CloneOptions {
    /// Head ref to check out via `--revision`.
    pub head_ref: Option<String>,
    /// Base ref to fetch after cloning, for diff computation.
    pub base_ref: Option<String>,
    /// Shallow clone (`--depth 1`).
    pub shallow: bool,
    /// Sparse checkout (`--sparse`).
    pub sparse: bool,
    /// Blob filtering (`--filter blob:none`).
    pub blob_filter: bool,
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self {
            head_ref: None,
            base_ref: None,
            shallow: true,
            sparse: true,
            blob_filter: true,
        }
    }
}

/// Clones a repository optimized for PR review into `target_dir`.
///
/// # Errors
/// [`GitError::Version`] when the installed git is too old, or the clone
/// subprocess failure.
pub async fn clone_repo(repo_url: &str, target_dir: &Path, opts: &CloneOptions) -> Result<PathBuf, GitError> {
    check_git_version().await?;

    debug!(
        url = repo_url,
        sparse = opts.sparse,
        shallow = opts.shallow,
        blob_filter = opts.blob_filter,
        target = %target_dir.display(),
        "cloning repository"
    );

    let mut args: Vec<String> = vec!["clone".into()];
    if opts.shallow {
        args.extend(["--depth".into(), "1".into()]);
    }
    if opts.sparse {
        args.push("--sparse".into());
    }
    if opts.blob_filter {
        args.extend(["--filter".into(), "blob:none".into()]);
    }
    if let Some(head) = &opts.head_ref {
        args.extend(["--revision".into(), head.clone()]);
    }
    args.push(repo_url.to_string());
    args.push(target_dir.display().to_string());

    let runner = GitRunner::default();
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    let out = runner.run(Path::new("."), &arg_refs).await?;
    if !out.success() {
        warn!(status = out.status, stderr = %out.stderr, "clone failed");
        return Err(GitError::Subprocess {
            command: arg_refs.join(" "),
            status: out.status,
            stderr: out.stderr,
        });
    }

    if let Some(base) = &opts.base_ref {
        let inspector = GitInspector::open(target_dir);
        inspector.fetch_commit_ref(base).await?;
    }

    Ok(target_dir.to_path_buf())
}

/// RAII clone: clones on creation, removes the directory on drop.
#[derive(Debug)]
pub struct TempGitRepository {
    path: PathBuf,
}

impl TempGitRepository {
    pub async fn clone(repo_url: &str, target_dir: &Path, opts: &CloneOptions) -> Result<Self, GitError> {
        let path = clone_repo(repo_url, target_dir, opts).await?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempGitRepository {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to delete temp clone");
        }
    }
}

/// Guard returned by [`GitInspector::ensure_commits_available`]; logs the
/// set of commits fetched within the scope when dropped.
#[derive(Debug, Default)]
pub struct LocalCommitsAvailability {
    fetched: Vec<String>,
}

impl Drop for LocalCommitsAvailability {
    fn drop(&mut self) {
        if !self.fetched.is_empty() {
            debug!(fetched = ?self.fetched, "commits fetched during scope");
        }
    }
}

/// Extracts commit hashes from `git fsck --root` output.
///
/// Recognized lines: `root <sha>` and `dangling commit <sha>`.
pub fn parse_fsck_commits(fsck_output: &str) -> std::collections::HashSet<String> {
    let mut commits = std::collections::HashSet::new();
    for line in fsck_output.lines() {
        if let Some(rest) = line.strip_prefix("root ") {
            if let Some(sha) = rest.split_whitespace().next() {
                commits.insert(sha.to_string());
            }
        } else if let Some(rest) = line.strip_prefix("dangling commit ") {
            if let Some(sha) = rest.split_whitespace().next() {
                commits.insert(sha.to_string());
            }
        }
    }
    commits
}

impl GitInspector {
    /// Fetches a single ref with partial-clone friendly flags.
    pub async fn fetch_commit_ref(&self, commit_ref: &str) -> Result<(), GitError> {
        self.git_ok(&[
            "fetch",
            "--no-tags",
            "--depth=1",
            "--filter=blob:none",
            "origin",
            commit_ref,
        ])
        .await?;
        Ok(())
    }

    /// Detects whether this clone is sparse.
    ///
    /// Checks `core.sparseCheckout` and the `.git/info/sparse-checkout`
    /// file; any detection failure is treated as "not sparse".
    pub async fn is_sparse_clone(&self) -> bool {
        match self.git(&["config", "core.sparseCheckout"]).await {
            Ok(out) if out.success() && out.stdout.trim().eq_ignore_ascii_case("true") => {
                debug!("sparse checkout enabled via git config");
                return true;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "error checking sparse checkout config");
                return false;
            }
        }

        let sparse_file = self.repo_path().join(".git").join("info").join("sparse-checkout");
        match tokio::fs::read_to_string(&sparse_file).await {
            Ok(content) if !content.trim().is_empty() => {
                debug!("sparse checkout file found with content");
                true
            }
            _ => false,
        }
    }

    /// Enumerates locally available commits via `git fsck --root`.
    async fn available_commits(&self) -> Result<std::collections::HashSet<String>, GitError> {
        let out = self.git_ok(&["fsck", "--root"]).await?;
        let commits = parse_fsck_commits(&out);
        debug!(count = commits.len(), "available commits enumerated");
        Ok(commits)
    }

    /// Ensures the given commits are present locally before an operation
    /// that dereferences them.
    ///
    /// Skips entirely when the clone is not sparse. Fetch failures are
    /// logged and ignored; the guarded operation may then fail downstream,
    /// which is reported to the caller. The guard is advisory only.
    pub async fn ensure_commits_available(&self, commits: &[&str]) -> LocalCommitsAvailability {
        let mut guard = LocalCommitsAvailability::default();
        if commits.is_empty() {
            debug!("no commits to check");
            return guard;
        }

        if !self.is_sparse_clone().await {
            debug!("repository is not a sparse clone, skipping commit checks");
            return guard;
        }

        let available = match self.available_commits().await {
            Ok(set) => set,
            Err(e) => {
                warn!(error = %e, "failed to enumerate local commits, skipping checks");
                return guard;
            }
        };

        for commit in commits {
            if available.contains(*commit) {
                debug!(commit, "commit found locally");
                continue;
            }
            debug!(commit, "commit not found locally, fetching");
            match self.fetch_commit_ref(commit).await {
                Ok(()) => guard.fetched.push((*commit).to_string()),
                Err(e) => warn!(commit, error = %e, "failed to fetch commit, continuing anyway"),
            }
        }
        guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::runner::{GitOutput, ScriptedGit};

    #[test]
    fn parses_plain_version() {
        assert_eq!(parse_git_version("git version 2.49.0"), Some((2, 49, 0)));
    }

    #[test]
    fn parses_version_with_platform_suffix() {
        assert_eq!(parse_git_version("git version 2.50.1.windows.1"), Some((2, 50, 1)));
    }

    #[test]
    fn rejects_garbage_version() {
        assert_eq!(parse_git_version("git"), None);
        assert_eq!(parse_git_version("git version abc"), None);
    }

    #[test]
    fn version_comparison_is_semantic() {
        assert!(version_meets((2, 49, 0), (2, 49, 0)));
        assert!(version_meets((3, 0, 0), (2, 49, 0)));
        assert!(!version_meets((2, 39, 5), (2, 49, 0)));
    }

    #[test]
    fn fsck_parse_extracts_roots_and_danglers() {
        let out = "root 71bc55741545ec0fc97cf393ba5a7a1b26d0f26e\n\
                   dangling commit 5f3c4403176c8739f5be4e183d6de24372778e24\n\
                   dangling blob 0000000000000000000000000000000000000000\n";
        let commits = parse_fsck_commits(out);
        assert_eq!(commits.len(), 2);
        assert!(commits.contains("71bc55741545ec0fc97cf393ba5a7a1b26d0f26e"));
        assert!(commits.contains("5f3c4403176c8739f5be4e183d6de24372778e24"));
    }

    #[tokio::test]
    async fn guard_skips_non_sparse_clones() {
        // No sparse config, no sparse-checkout file: fsck must not run.
        let runner = ScriptedGit::new().on("config core.sparseCheckout", GitOutput::failed(1, ""));
        let inspector = GitInspector::with_runner("/nonexistent", GitRunner::Scripted(runner));
        let guard = inspector.ensure_commits_available(&["abc123"]).await;
        assert!(guard.fetched.is_empty());
    }

    #[tokio::test]
    async fn guard_fetches_missing_commits_in_sparse_clone() {
        let runner = ScriptedGit::new()
            .on("config core.sparseCheckout", GitOutput::ok("true\n"))
            .on("fsck --root", GitOutput::ok("root aaa111\n"))
            .on(
                "fetch --no-tags --depth=1 --filter=blob:none origin bbb222",
                GitOutput::ok(""),
            );
        let inspector = GitInspector::with_runner("/nonexistent", GitRunner::Scripted(runner));
        let guard = inspector.ensure_commits_available(&["aaa111", "bbb222"]).await;
        assert_eq!(guard.fetched, vec!["bbb222".to_string()]);
    }

    #[tokio::test]
    async fn guard_survives_fetch_failure() {
        let runner = ScriptedGit::new()
            .on("config core.sparseCheckout", GitOutput::ok("true\n"))
            .on("fsck --root", GitOutput::ok(""));
        // fetch for ccc333 is unscripted and fails with status 128
        let inspector = GitInspector::with_runner("/nonexistent", GitRunner::Scripted(runner));
        let guard = inspector.ensure_commits_available(&["ccc333"]).await;
        assert!(guard.fetched.is_empty());
    }
}
