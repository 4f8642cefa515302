//! Changed-file listing and diff extraction.

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};

use crate::errors::GitError;
use crate::git::runner::GitInspector;

/// Files per `git diff` invocation when diffing a path set.
pub const DEFAULT_DIFF_BATCH_SIZE: usize = 50;

/// Change status of a path between two commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
}

impl ChangeStatus {
    pub fn as_char(self) -> char {
        match self {
            Self::Added => 'A',
            Self::Modified => 'M',
            Self::Deleted => 'D',
        }
    }

    fn from_name_status(token: &str) -> Self {
        match token.chars().next() {
            Some('A') => Self::Added,
            Some('D') => Self::Deleted,
            _ => Self::Modified,
        }
    }
}

/// One changed path with its stats.
#[derive(Debug, Clone)]
pub struct FileDiffInfo {
    pub status: ChangeStatus,
    pub file_path: String,
    pub additions: u64,
    pub deletions: u64,
    /// Size at the head commit, in KB; 0 for deleted or binary files.
    pub size_kb: u64,
}

impl FileDiffInfo {
    /// `[A|M|D] path | +adds -dels | sizeKB`
    pub fn format_line(&self) -> String {
        format!(
            "[{}] {} | +{} -{} | {}KB",
            self.status.as_char(),
            self.file_path,
            self.additions,
            self.deletions,
            self.size_kb
        )
    }
}

/// Builds a matcher from glob patterns; invalid patterns are skipped with a
/// warning so one bad pattern does not sink the whole filter.
fn build_globset(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        match Glob::new(pat) {
            Ok(g) => {
                builder.add(g);
            }
            Err(e) => warn!(pattern = %pat, error = %e, "ignoring invalid glob pattern"),
        }
    }
    builder.build().unwrap_or_else(|e| {
        warn!(error = %e, "glob set build failed, matching nothing");
        GlobSet::empty()
    })
}

/// Applies the include → exclude → reinclude filter order.
///
/// 1. When `include` is non-empty, keep only paths matching an include glob.
/// 2. Drop paths matching any exclude glob.
/// 3. Rescue dropped paths matching any reinclude glob.
pub fn filter_changed_paths(
    paths: Vec<String>,
    include: &[String],
    exclude: &[String],
    reinclude: &[String],
) -> Vec<String> {
    let include_set = build_globset(include);
    let exclude_set = build_globset(exclude);
    let reinclude_set = build_globset(reinclude);

    let overlap: Vec<&String> = include.iter().filter(|p| exclude.contains(p)).collect();
    if !overlap.is_empty() {
        warn!(
            ?overlap,
            "overlapping include and exclude patterns; exclude takes precedence"
        );
    }

    paths
        .into_iter()
        .filter(|p| {
            if !include.is_empty() && !include_set.is_match(p) {
                return false;
            }
            if exclude_set.is_match(p) && !reinclude_set.is_match(p) {
                return false;
            }
            true
        })
        .collect()
}

impl GitInspector {
    /// Lists files changed between two refs, one structured record per path.
    ///
    /// Stats come from `diff --numstat` joined with `diff --name-status`;
    /// binary files report 0/0. Sizes are sampled at `head`. Sorted by path.
    pub async fn list_changed_files_as_objects(
        &self,
        base: &str,
        head: &str,
    ) -> Result<Vec<FileDiffInfo>, GitError> {
        let _guard = self.ensure_commits_available(&[base, head]).await;
        let numstat = self.git_ok(&["diff", base, head, "--numstat"]).await?;
        let name_status = self.git_ok(&["diff", base, head, "--name-status"]).await?;

        let mut status_map = std::collections::HashMap::new();
        for line in name_status.lines() {
            let mut parts = line.split('\t');
            if let (Some(status), Some(path)) = (parts.next(), parts.next_back()) {
                if !path.is_empty() {
                    status_map.insert(path.to_string(), ChangeStatus::from_name_status(status));
                }
            }
        }

        let mut files = Vec::new();
        for line in numstat.lines() {
            let parts: Vec<&str> = line.split('\t').collect();
            let [additions, deletions, file_path] = parts.as_slice() else {
                continue;
            };
            // "-" marks binary files in numstat output.
            let additions = additions.parse().unwrap_or(0);
            let deletions = deletions.parse().unwrap_or(0);
            let size_kb = match self.get_file_size_at_commit(head, file_path).await {
                Ok(bytes) => bytes / 1024,
                Err(e) => {
                    warn!(path = *file_path, error = %e, "error getting file size, continuing");
                    0
                }
            };
            files.push(FileDiffInfo {
                status: status_map.get(*file_path).copied().unwrap_or(ChangeStatus::Modified),
                file_path: (*file_path).to_string(),
                additions,
                deletions,
                size_kb,
            });
        }
        files.sort_by(|a, b| a.file_path.cmp(&b.file_path));
        Ok(files)
    }

    /// Formatted changed-file listing, one `[A|M|D] path | +a -d | sizeKB`
    /// line per path, sorted lexicographically.
    pub async fn list_changed_files(&self, base: &str, head: &str) -> Result<String, GitError> {
        let files = self.list_changed_files_as_objects(base, head).await?;
        let mut lines: Vec<String> = files.iter().map(FileDiffInfo::format_line).collect();
        lines.sort();
        Ok(lines.join("\n"))
    }

    /// Unified diff between two commits, with glob filtering applied in
    /// include → exclude → reinclude order and path batching.
    ///
    /// # Errors
    /// [`GitError::DiffNotFound`] when the diff cannot be produced.
    pub async fn get_diff_between_commits(
        &self,
        base: &str,
        head: &str,
        exclude: &[String],
        include: &[String],
        reinclude: &[String],
        batch_size: usize,
    ) -> Result<String, GitError> {
        let result: Result<String, GitError> = async {
            let _guard = self.ensure_commits_available(&[base, head]).await;
            let changed = self.git_ok(&["diff", base, head, "--name-only"]).await?;
            let paths: Vec<String> = changed.lines().map(str::to_string).collect();
            let filtered = filter_changed_paths(paths, include, exclude, reinclude);

            let mut diffs = Vec::new();
            for batch in filtered.chunks(batch_size.max(1)) {
                let mut args = vec!["diff", base, head, "--"];
                args.extend(batch.iter().map(String::as_str));
                diffs.push(self.git_ok(&args).await?);
            }
            Ok(diffs.join("\n"))
        }
        .await;

        result.map_err(|e| {
            warn!(error = %e, "unexpected error getting diff");
            GitError::DiffNotFound {
                base: base.to_string(),
                head: head.to_string(),
            }
        })
    }

    /// Unified diff restricted to `paths`, batched; unknown or undiffable
    /// paths are skipped silently. Empty `paths` yields the full diff.
    pub async fn get_diff_for_files(
        &self,
        base: &str,
        head: &str,
        paths: &[String],
        batch_size: usize,
    ) -> Result<String, GitError> {
        let _guard = self.ensure_commits_available(&[base, head]).await;
        if paths.is_empty() {
            return self.git_ok(&["diff", base, head]).await;
        }

        let mut diffs = Vec::new();
        for batch in paths.chunks(batch_size.max(1)) {
            let mut args = vec!["diff", base, head, "--"];
            args.extend(batch.iter().map(String::as_str));
            match self.git_ok(&args).await {
                Ok(diff) if !diff.is_empty() => diffs.push(diff),
                Ok(_) => {}
                Err(e) => {
                    debug!(?batch, error = %e, "files not found or can't be diffed, skipping");
                }
            }
        }
        Ok(diffs.join("\n"))
    }
}
