//! Single-shot description generation.
//!
//! Full filtered diff → token-bound truncation → one chat call → markdown
//! code-block removal.

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use lampe_core::errors::LampeResult;
use lampe_core::git::diff::DEFAULT_DIFF_BATCH_SIZE;
use lampe_core::git::{GitInspector, GitRunner};
use lampe_core::parsers::remove_markdown_code_block;
use lampe_core::utils::token::truncate_to_token_limit;
use lampe_core::workflow::agent::ChatClient;
use lampe_core::{PullRequest, Repository};
use llm_service::{ChatMessage, ChatOutcome};

use crate::prompts::{SYSTEM_PR_DESCRIPTION_MESSAGE, USER_PR_DESCRIPTION_MESSAGE};

/// Max tokens for the diff content; bounds spend on huge PRs.
pub const DEFAULT_TRUNCATION_TOKENS: usize = 100_000;

/// Input shared by both description variants.
#[derive(Debug, Clone)]
pub struct PRDescriptionInput {
    pub repository: Repository,
    pub pull_request: PullRequest,
    pub files_exclude_patterns: Vec<String>,
    /// Patterns rescuing excluded files (e.g. keep `README.txt` despite
    /// `*.txt`). The agentic variant accepts and ignores these.
    pub files_reinclude_patterns: Vec<String>,
}

/// Output of either variant.
#[derive(Debug, Clone, Serialize)]
pub struct PRDescriptionOutput {
    pub description: String,
}

/// Builds the user prompt from the truncated diff.
pub(crate) fn render_user_prompt(pr_title: &str, diff: &str) -> String {
    USER_PR_DESCRIPTION_MESSAGE
        .replace("{pr_title}", pr_title)
        .replace("{pull_request_diff}", diff)
}

/// Generates a description from the truncated full diff.
pub async fn generate_pr_description(
    input: &PRDescriptionInput,
    chat: &ChatClient,
    runner: GitRunner,
    truncation_tokens: usize,
) -> LampeResult<PRDescriptionOutput> {
    let t0 = Instant::now();
    let inspector = GitInspector::with_runner(&input.repository.local_path, runner);

    let diff = inspector
        .get_diff_between_commits(
            &input.pull_request.base_commit_hash,
            &input.pull_request.head_commit_hash,
            &input.files_exclude_patterns,
            &[],
            &input.files_reinclude_patterns,
            DEFAULT_DIFF_BATCH_SIZE,
        )
        .await?;
    debug!(diff_len = diff.len(), "computed full PR diff");

    let diff = truncate_to_token_limit(&diff, truncation_tokens)?;
    let formatted_prompt = render_user_prompt(&input.pull_request.title, &diff);

    let messages = vec![
        ChatMessage::system(SYSTEM_PR_DESCRIPTION_MESSAGE),
        ChatMessage::user(formatted_prompt),
    ];
    let reply = match chat.chat(&messages, &[]).await? {
        ChatOutcome::Message(text) => text,
        ChatOutcome::ToolCalls { text, .. } => text,
    };

    let description = remove_markdown_code_block(&reply);
    info!(
        description_len = description.len(),
        elapsed_ms = t0.elapsed().as_millis(),
        "description generated"
    );
    Ok(PRDescriptionOutput { description })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lampe_core::git::{GitOutput, ScriptedGit};
    use lampe_core::workflow::agent::scripted::ScriptedChat;

    fn input() -> PRDescriptionInput {
        PRDescriptionInput {
            repository: Repository {
                local_path: "/repo".into(),
                full_name: None,
            },
            pull_request: PullRequest::local("Add widget", "base", "head"),
            files_exclude_patterns: vec![],
            files_reinclude_patterns: vec![],
        }
    }

    fn scripted_repo(diff: &str) -> ScriptedGit {
        ScriptedGit::new()
            .on("config core.sparseCheckout", GitOutput::failed(1, ""))
            .on("diff base head --name-only", GitOutput::ok("w.rs\n"))
            .on("diff base head -- w.rs", GitOutput::ok(diff))
    }

    #[tokio::test]
    async fn unwraps_fenced_markdown_reply() {
        let chat = ScriptedChat::new(vec![ChatOutcome::Message(
            "```md\nAdds the widget.\n```".into(),
        )]);
        let out = generate_pr_description(
            &input(),
            &ChatClient::Scripted(chat),
            GitRunner::Scripted(scripted_repo("+fn widget() {}\n")),
            DEFAULT_TRUNCATION_TOKENS,
        )
        .await
        .unwrap();
        assert_eq!(out.description, "Adds the widget.");
    }

    #[tokio::test]
    async fn tiny_token_budget_truncates_the_diff_but_keeps_the_frame() {
        // A diff with a thousand identical lines plus a function body.
        let big_diff = format!("{}+fn new_function() {{ body }}\n", "+same line\n".repeat(1000));
        let chat = ScriptedChat::new(vec![ChatOutcome::Message("short".into())]);
        let scripted = chat.clone();

        let out = generate_pr_description(
            &input(),
            &ChatClient::Scripted(chat),
            GitRunner::Scripted(scripted_repo(&big_diff)),
            1,
        )
        .await
        .unwrap();
        assert_eq!(out.description, "short");

        let seen = scripted.seen.lock().unwrap();
        let user_prompt = &seen[0][1].content;
        assert!(user_prompt.len() < 400);
        assert!(user_prompt.contains("<code_changes>"));
        assert!(!user_prompt.contains("new_function"));
    }
}
