//! Agentic description generation.
//!
//! A function-calling agent receives the changed-file summary and the git
//! tool set, inspects whatever it needs, and its final reply is the
//! description verbatim (no markdown post-processing).

use std::time::Duration;

use serde_json::{Map, json};
use tracing::debug;

use lampe_core::errors::LampeResult;
use lampe_core::git::{GitInspector, GitRunner};
use lampe_core::tools::ToolRegistry;
use lampe_core::workflow::agent::{ChatClient, FunctionCallingAgent};

use crate::generation::{PRDescriptionInput, PRDescriptionOutput};
use crate::prompts::{AGENTIC_SYSTEM_PROMPT, AGENTIC_USER_PROMPT};

/// Generates a description by letting the agent explore the repository.
///
/// `files_reinclude_patterns` on the input is deliberately unused here.
pub async fn generate_pr_description_agentic(
    input: &PRDescriptionInput,
    chat: &ChatClient,
    runner: GitRunner,
    timeout: Option<Duration>,
) -> LampeResult<PRDescriptionOutput> {
    let inspector = GitInspector::with_runner(&input.repository.local_path, runner.clone());
    let files_changed = inspector
        .list_changed_files(&input.pull_request.base_commit_hash, &input.pull_request.head_commit_hash)
        .await?;
    debug!(files_changed_len = files_changed.len(), "prepared changed-file summary");

    let query = AGENTIC_USER_PROMPT
        .replace("{pr_title}", &input.pull_request.title)
        .replace("{base_commit_hash}", &input.pull_request.base_commit_hash)
        .replace("{head_commit_hash}", &input.pull_request.head_commit_hash)
        .replace("{files_changed}", &files_changed);

    let registry = ToolRegistry::with_runner(runner);
    let mut agent = FunctionCallingAgent::new(chat.clone(), registry, Some(AGENTIC_SYSTEM_PROMPT.to_string()))
        .with_timeout(timeout);
    let mut partial = Map::new();
    partial.insert("repo_path".into(), json!(input.repository.local_path));
    agent.update_tools(partial);

    let run = agent.run(query).await?;

    Ok(PRDescriptionOutput {
        description: run.output.unwrap_or_default(),
    })
}
