//! Command-line surface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "lampe", version, about = "Generate PR descriptions and code reviews with an LLM")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn verbose(&self) -> bool {
        match &self.command {
            Command::Describe(args) => args.verbose,
            Command::Review(args) => args.verbose,
            Command::CheckReviewed(_) | Command::Healthcheck => false,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a PR description and deliver it to the output provider.
    Describe(DescribeArgs),
    /// Generate a PR code review and deliver it to the output provider.
    Review(ReviewArgs),
    /// Exit 0 if the authenticated identity has already reviewed the PR.
    CheckReviewed(CheckReviewedArgs),
    /// Verify environment and connectivity; exit 1 on any failure.
    Healthcheck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DescribeVariant {
    Default,
    Agentic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReviewVariant {
    MultiAgent,
    DiffByDiff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DepthArg {
    Basic,
    Standard,
    Comprehensive,
}

#[derive(Debug, Args)]
pub struct DescribeArgs {
    /// Path to the local clone.
    #[arg(long)]
    pub repo: PathBuf,
    /// Repository full name (e.g. owner/repo).
    #[arg(long)]
    pub repo_full_name: Option<String>,
    /// Base commit SHA.
    #[arg(long)]
    pub base: String,
    /// Head commit SHA.
    #[arg(long)]
    pub head: String,
    /// PR title (local runs).
    #[arg(long, default_value = "Pull Request")]
    pub title: String,
    /// Output provider (auto|console|github|gitlab|bitbucket).
    #[arg(long, default_value = "auto")]
    pub output: String,
    #[arg(long, value_enum, default_value = "default")]
    pub variant: DescribeVariant,
    /// Glob patterns to exclude from the diff (repeatable).
    #[arg(long = "exclude")]
    pub files_exclude: Vec<String>,
    /// Glob patterns rescuing excluded files (repeatable).
    #[arg(long = "reinclude")]
    pub files_reinclude: Vec<String>,
    /// Token budget for the diff content.
    #[arg(long = "max-tokens", default_value_t = 100_000)]
    pub truncation_tokens: usize,
    #[arg(long = "timeout-seconds")]
    pub timeout: Option<u64>,
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Debug, Args)]
pub struct ReviewArgs {
    /// Path to the local clone.
    #[arg(long)]
    pub repo: PathBuf,
    /// Repository full name (e.g. owner/repo).
    #[arg(long)]
    pub repo_full_name: Option<String>,
    /// Base commit SHA.
    #[arg(long)]
    pub base: String,
    /// Head commit SHA.
    #[arg(long)]
    pub head: String,
    /// PR title (local runs).
    #[arg(long, default_value = "Pull Request")]
    pub title: String,
    /// Output provider (auto|console|github|gitlab|bitbucket).
    #[arg(long, default_value = "auto")]
    pub output: String,
    /// Review depth (basic|standard|comprehensive).
    #[arg(long, value_enum, default_value = "standard")]
    pub review_depth: DepthArg,
    #[arg(long, value_enum, default_value = "multi-agent")]
    pub variant: ReviewVariant,
    /// Custom review guidelines (repeatable).
    #[arg(long = "guideline")]
    pub guidelines: Vec<String>,
    /// Glob patterns to exclude from review (repeatable).
    #[arg(long = "exclude")]
    pub files_exclude: Vec<String>,
    #[arg(long = "timeout-seconds")]
    pub timeout: Option<u64>,
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Debug, Args)]
pub struct CheckReviewedArgs {
    /// Path to the local clone.
    #[arg(long)]
    pub repo: PathBuf,
    /// Repository full name (e.g. owner/repo).
    #[arg(long)]
    pub repo_full_name: Option<String>,
    /// Output provider (auto|console|github|gitlab|bitbucket).
    #[arg(long, default_value = "auto")]
    pub output: String,
    /// Pull request number.
    #[arg(long = "pr")]
    pub pr_number: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn describe_parses_with_defaults() {
        let cli = Cli::parse_from([
            "lampe", "describe", "--repo", "/tmp/r", "--base", "aaa", "--head", "bbb",
        ]);
        let Command::Describe(args) = cli.command else {
            panic!("expected describe");
        };
        assert_eq!(args.title, "Pull Request");
        assert_eq!(args.output, "auto");
        assert_eq!(args.variant, DescribeVariant::Default);
        assert_eq!(args.truncation_tokens, 100_000);
    }

    #[test]
    fn review_accepts_repeated_flags() {
        let cli = Cli::parse_from([
            "lampe",
            "review",
            "--repo",
            "/tmp/r",
            "--base",
            "aaa",
            "--head",
            "bbb",
            "--variant",
            "diff-by-diff",
            "--guideline",
            "no unwrap",
            "--guideline",
            "log errors",
            "--exclude",
            "*.lock",
        ]);
        let Command::Review(args) = cli.command else {
            panic!("expected review");
        };
        assert_eq!(args.variant, ReviewVariant::DiffByDiff);
        assert_eq!(args.guidelines.len(), 2);
        assert_eq!(args.files_exclude, vec!["*.lock".to_string()]);
    }

    #[test]
    fn check_reviewed_requires_pr() {
        assert!(Cli::try_parse_from(["lampe", "check-reviewed", "--repo", "/tmp/r"]).is_err());
        let cli = Cli::parse_from(["lampe", "check-reviewed", "--repo", "/tmp/r", "--pr", "7"]);
        let Command::CheckReviewed(args) = cli.command else {
            panic!("expected check-reviewed");
        };
        assert_eq!(args.pr_number, 7);
    }
}
