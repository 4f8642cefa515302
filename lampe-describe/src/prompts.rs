//! Prompt text for the description pipelines.
//!
//! Placeholders (`{pr_title}`, `{pull_request_diff}`, `{files_changed}`)
//! are the contract; rendering is plain substitution.

pub const SYSTEM_PR_DESCRIPTION_MESSAGE: &str = "\
You are an expert software engineer writing pull request descriptions. Given a PR title and its \
unified diff, write a clear, concise description in markdown explaining what is changing and why. \
Structure: a one-paragraph overview, then a short bullet list of the notable changes. Do not \
restate the diff line by line, do not invent changes that are not in the diff, and do not add a \
title heading. Reply with the description only.";

pub const USER_PR_DESCRIPTION_MESSAGE: &str = r#"PR title: {pr_title}

<code_changes>
{pull_request_diff}
</code_changes>

Write the pull request description for these changes."#;

pub const AGENTIC_SYSTEM_PROMPT: &str = "\
You are an expert software engineer writing a pull request description. You are given the list of \
changed files and tools to inspect the repository: fetch diffs per file, read file contents at a \
commit, find files by pattern, and search file contents. Inspect whatever you need, starting from \
the most significant files, then write a clear, concise markdown description of what is changing \
and why: a one-paragraph overview followed by a short bullet list of notable changes. Your final \
reply must be the description itself, nothing else.";

pub const AGENTIC_USER_PROMPT: &str = r#"PR title: {pr_title}
Base commit: {base_commit_hash}
Head commit: {head_commit_hash}

Files changed:
{files_changed}

Inspect the changes and write the pull request description."#;
