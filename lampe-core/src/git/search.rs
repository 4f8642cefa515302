//! Pattern search at a commit.

use tracing::warn;

use crate::errors::GitError;
use crate::git::runner::GitInspector;

impl GitInspector {
    /// Greps for `pattern` (POSIX extended regex) within `relative_dir_path`
    /// at `commit`.
    ///
    /// Returns a fenced ```grep block, or the literal `"No matches found"`
    /// when nothing matches. Grep failures are reported in-band as an error
    /// string so agents can react to them.
    pub async fn search_in_files(
        &self,
        pattern: &str,
        relative_dir_path: &str,
        commit: &str,
        include_line_numbers: bool,
    ) -> Result<String, GitError> {
        let dir = if relative_dir_path.is_empty() { "." } else { relative_dir_path };
        let treeish = format!("{commit}:{dir}");

        let mut args = vec!["grep"];
        if include_line_numbers {
            args.push("-n");
        }
        args.extend(["-E", pattern, treeish.as_str()]);

        let out = self.git(&args).await?;
        match out.status {
            0 => {
                if out.stdout.is_empty() {
                    Ok("No matches found".to_string())
                } else {
                    Ok(format!("```grep\n{}\n```", out.stdout.trim_end_matches('\n')))
                }
            }
            // git grep exits 1 on no matches; 128 covers bad tree-ish paths.
            1 | 128 => Ok("No matches found".to_string()),
            status => {
                warn!(status, stderr = %out.stderr, "git grep failed");
                Ok(format!("Error executing git grep: {}", out.stderr.trim()))
            }
        }
    }

    /// Lists tracked files matching a pathspec pattern.
    ///
    /// Returns a fenced ```shell block, or the literal `"No files found"`.
    pub async fn find_files_by_pattern(&self, pattern: &str) -> Result<String, GitError> {
        let out = self.git(&["ls-files", "--", pattern]).await?;
        if !out.success() {
            warn!(status = out.status, stderr = %out.stderr, "error finding files");
            return Ok(format!("Error: {}", out.stderr.trim()));
        }

        let matching: Vec<&str> = out.stdout.lines().filter(|l| !l.is_empty()).collect();
        if matching.is_empty() {
            Ok("No files found".to_string())
        } else {
            Ok(format!("```shell\n{}\n```", matching.join("\n")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::runner::{GitOutput, GitRunner, ScriptedGit};

    fn inspector_with(args: &str, out: GitOutput) -> GitInspector {
        let runner = ScriptedGit::new().on(args, out);
        GitInspector::with_runner("/repo", GitRunner::Scripted(runner))
    }

    #[tokio::test]
    async fn search_wraps_hits_in_grep_fence() {
        let inspector = inspector_with(
            "grep -n -E foo abc:src",
            GitOutput::ok("abc:src:main.rs:3:foo()\n"),
        );
        let got = inspector.search_in_files("foo", "src", "abc", true).await.unwrap();
        assert_eq!(got, "```grep\nabc:src:main.rs:3:foo()\n```");
    }

    #[tokio::test]
    async fn search_no_matches_exit_one() {
        let inspector = inspector_with("grep -E foo abc:.", GitOutput::failed(1, ""));
        let got = inspector.search_in_files("foo", "", "abc", false).await.unwrap();
        assert_eq!(got, "No matches found");
    }

    #[tokio::test]
    async fn search_status_128_is_no_matches() {
        let inspector = inspector_with("grep -E foo abc:nope", GitOutput::failed(128, "fatal: bad object"));
        let got = inspector.search_in_files("foo", "nope", "abc", false).await.unwrap();
        assert_eq!(got, "No matches found");
    }

    #[tokio::test]
    async fn find_files_wraps_in_shell_fence() {
        let inspector = inspector_with("ls-files -- *.rs", GitOutput::ok("a.rs\nsub/b.rs\n"));
        let got = inspector.find_files_by_pattern("*.rs").await.unwrap();
        assert_eq!(got, "```shell\na.rs\nsub/b.rs\n```");
    }

    #[tokio::test]
    async fn find_files_empty_is_no_files_found() {
        let inspector = inspector_with("ls-files -- *.zig", GitOutput::ok(""));
        let got = inspector.find_files_by_pattern("*.zig").await.unwrap();
        assert_eq!(got, "No files found");
    }
}
