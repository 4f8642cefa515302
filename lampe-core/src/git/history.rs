//! Commit display and log.

use crate::errors::GitError;
use crate::git::runner::GitInspector;

/// The well-known sha of git's empty tree, used to diff root commits.
const EMPTY_TREE_SHA: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

impl GitInspector {
    /// Commit header (sha, author, date, message, stats, file list) followed
    /// by the diff against the first parent, or against the empty tree for
    /// root commits.
    pub async fn show_commit(&self, commit_ref: &str) -> Result<String, GitError> {
        let _guard = self.ensure_commits_available(&[commit_ref]).await;
        let header = self.commit_header(commit_ref).await?;

        let parent = format!("{commit_ref}^");
        let base = if self.git(&["rev-parse", "--verify", &parent]).await?.success() {
            parent
        } else {
            EMPTY_TREE_SHA.to_string()
        };
        let diff = self.git_ok(&["diff", &base, commit_ref]).await?;

        Ok(format!("{header}\n{diff}"))
    }

    /// Headers for the last `max_count` commits reachable from HEAD.
    pub async fn get_commit_log(&self, max_count: usize) -> Result<String, GitError> {
        let count = max_count.to_string();
        let shas = self.git_ok(&["rev-list", "-n", &count, "HEAD"]).await?;
        let mut log = Vec::new();
        for sha in shas.lines().filter(|l| !l.is_empty()) {
            log.push(self.commit_header(sha).await?);
        }
        Ok(log.join("\n"))
    }

    async fn commit_header(&self, commit_ref: &str) -> Result<String, GitError> {
        // NUL separators survive multi-line commit messages.
        let meta = self
            .git_ok(&["show", "-s", "--format=%H%x00%an <%ae>%x00%ad%x00%B", commit_ref])
            .await?;
        let mut fields = meta.splitn(4, '\0');
        let sha = fields.next().unwrap_or_default().trim();
        let author = fields.next().unwrap_or_default().trim();
        let date = fields.next().unwrap_or_default().trim();
        let message = fields.next().unwrap_or_default().trim();

        let parent = format!("{commit_ref}^");
        let base = if self.git(&["rev-parse", "--verify", &parent]).await?.success() {
            parent
        } else {
            EMPTY_TREE_SHA.to_string()
        };
        let numstat = self.git_ok(&["diff", &base, commit_ref, "--numstat"]).await?;

        let mut insertions: u64 = 0;
        let mut deletions: u64 = 0;
        let mut files = Vec::new();
        for line in numstat.lines() {
            let parts: Vec<&str> = line.split('\t').collect();
            if let [adds, dels, path] = parts.as_slice() {
                insertions += adds.parse::<u64>().unwrap_or(0);
                deletions += dels.parse::<u64>().unwrap_or(0);
                files.push(*path);
            }
        }

        Ok(format!(
            "Commit: {sha}\nAuthor: {author}\nDate: {date}\nMessage: {message}\n\
             Files: {} files changed\nChanges: +{insertions} -{deletions}\nModified files:\n{}",
            files.len(),
            files.iter().map(|f| format!("  - {f}")).collect::<Vec<_>>().join("\n"),
        ))
    }
}
