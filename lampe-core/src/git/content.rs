//! Blob content access at a commit.

use tracing::warn;

use crate::errors::GitError;
use crate::git::runner::GitInspector;

impl GitInspector {
    /// Whether `file_path` exists at `commit`.
    ///
    /// Status 128 from `cat-file -e` means "no"; anything else unexpected
    /// propagates.
    pub async fn file_exists(&self, commit: &str, file_path: &str) -> Result<bool, GitError> {
        let _guard = self.ensure_commits_available(&[commit]).await;
        let spec = format!("{commit}:{file_path}");
        let out = self.git(&["cat-file", "-e", &spec]).await?;
        if out.success() {
            Ok(true)
        } else if out.status == 128 {
            Ok(false)
        } else {
            Err(GitError::Subprocess {
                command: format!("cat-file -e {spec}"),
                status: out.status,
                stderr: out.stderr,
            })
        }
    }

    /// File content at a commit, optionally sliced to an inclusive 0-based
    /// line range and/or prefixed with right-aligned line numbers.
    ///
    /// # Errors
    /// [`GitError::FileNotFound`] when the path is absent at the commit.
    pub async fn get_file_content_at_commit(
        &self,
        commit: &str,
        file_path: &str,
        line_range: Option<(usize, usize)>,
        include_line_numbers: bool,
    ) -> Result<String, GitError> {
        let _guard = self.ensure_commits_available(&[commit]).await;
        let spec = format!("{commit}:{file_path}");
        let out = self.git(&["show", &spec]).await?;
        if !out.success() {
            warn!(commit, path = file_path, stderr = %out.stderr, "error getting file content");
            return Err(GitError::FileNotFound {
                commit: commit.to_string(),
                path: file_path.to_string(),
            });
        }

        let mut blob = out.stdout;
        if let Some((start, end)) = line_range {
            let lines: Vec<&str> = blob.lines().collect();
            // Reversed or out-of-range slices yield an empty string.
            if start >= lines.len() || start > end {
                blob = String::new();
            } else {
                let end = end.min(lines.len().saturating_sub(1));
                blob = lines[start..=end].join("\n");
            }
        }

        if include_line_numbers {
            let start_line = line_range.map(|(s, _)| s).unwrap_or(0);
            blob = blob
                .lines()
                .enumerate()
                .map(|(i, line)| format!("{:>6}| {}", start_line + i, line))
                .collect::<Vec<_>>()
                .join("\n");
        }

        Ok(blob)
    }

    /// File size in bytes at a commit; 0 when the path is absent there.
    pub async fn get_file_size_at_commit(&self, commit: &str, file_path: &str) -> Result<u64, GitError> {
        let _guard = self.ensure_commits_available(&[commit]).await;
        let spec = format!("{commit}:{file_path}");
        let out = self.git(&["cat-file", "-s", &spec]).await?;
        if !out.success() {
            if out.status == 128 {
                return Ok(0);
            }
            return Err(GitError::Subprocess {
                command: format!("cat-file -s {spec}"),
                status: out.status,
                stderr: out.stderr,
            });
        }
        Ok(out.stdout.trim().parse().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::runner::{GitOutput, GitRunner, ScriptedGit};

    fn inspector_with(args: &str, out: GitOutput) -> GitInspector {
        let runner = ScriptedGit::new()
            .on("config core.sparseCheckout", GitOutput::failed(1, ""))
            .on(args, out);
        GitInspector::with_runner("/repo", GitRunner::Scripted(runner))
    }

    #[tokio::test]
    async fn content_line_range_is_inclusive_and_zero_based() {
        let inspector = inspector_with("show abc:f.txt", GitOutput::ok("l0\nl1\nl2\nl3\n"));
        let got = inspector
            .get_file_content_at_commit("abc", "f.txt", Some((1, 2)), false)
            .await
            .unwrap();
        assert_eq!(got, "l1\nl2");
    }

    #[tokio::test]
    async fn content_line_numbers_are_right_aligned() {
        let inspector = inspector_with("show abc:f.txt", GitOutput::ok("alpha\nbeta\n"));
        let got = inspector
            .get_file_content_at_commit("abc", "f.txt", None, true)
            .await
            .unwrap();
        assert_eq!(got, "     0| alpha\n     1| beta");
    }

    #[tokio::test]
    async fn content_line_numbers_start_at_range_start() {
        let inspector = inspector_with("show abc:f.txt", GitOutput::ok("l0\nl1\nl2\nl3\n"));
        let got = inspector
            .get_file_content_at_commit("abc", "f.txt", Some((2, 3)), true)
            .await
            .unwrap();
        assert_eq!(got, "     2| l2\n     3| l3");
    }

    #[tokio::test]
    async fn content_reversed_range_is_empty() {
        let inspector = inspector_with("show abc:f.txt", GitOutput::ok("l0\nl1\nl2\nl3\nl4\nl5\nl6\nl7\nl8\nl9\nl10\nl11\n"));
        let got = inspector
            .get_file_content_at_commit("abc", "f.txt", Some((10, 5)), false)
            .await
            .unwrap();
        assert_eq!(got, "");
    }

    #[tokio::test]
    async fn content_range_beyond_eof_is_clamped() {
        let inspector = inspector_with("show abc:f.txt", GitOutput::ok("only\n"));
        let got = inspector
            .get_file_content_at_commit("abc", "f.txt", Some((0, 99)), false)
            .await
            .unwrap();
        assert_eq!(got, "only");

        let inspector = inspector_with("show abc:f.txt", GitOutput::ok("only\n"));
        let got = inspector
            .get_file_content_at_commit("abc", "f.txt", Some((5, 9)), false)
            .await
            .unwrap();
        assert_eq!(got, "");
    }

    #[tokio::test]
    async fn missing_file_maps_to_file_not_found() {
        let inspector = inspector_with(
            "show abc:gone.txt",
            GitOutput::failed(128, "fatal: path 'gone.txt' does not exist in 'abc'"),
        );
        let err = inspector
            .get_file_content_at_commit("abc", "gone.txt", None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, GitError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn file_exists_distinguishes_status_128() {
        let inspector = inspector_with("cat-file -e abc:there.rs", GitOutput::ok(""));
        assert!(inspector.file_exists("abc", "there.rs").await.unwrap());

        let inspector = inspector_with("cat-file -e abc:not.rs", GitOutput::failed(128, ""));
        assert!(!inspector.file_exists("abc", "not.rs").await.unwrap());
    }

    #[tokio::test]
    async fn size_of_missing_path_is_zero() {
        let inspector = inspector_with("cat-file -s abc:gone", GitOutput::failed(128, "missing"));
        assert_eq!(inspector.get_file_size_at_commit("abc", "gone").await.unwrap(), 0);
    }
}
