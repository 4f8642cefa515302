//! Sequential multi-agent review pipeline.
//!
//! Whole-PR specialized agents run one after another; a failing agent is
//! skipped and the rest continue. Findings are merged heuristically (no
//! LLM aggregation pass on this path).

use std::time::Duration;

use tracing::{debug, warn};

use lampe_core::errors::LampeResult;
use lampe_core::git::{GitInspector, GitRunner};
use lampe_core::workflow::agent::ChatClient;

use crate::agents::{AgentSpec, SpecializedReviewAgent};
use crate::aggregator::aggregate_agent_reviews;
use crate::data_models::{AgentReviewInput, AgentReviewOutput, FileReview, PRReviewInput};

/// Wiring for one multi-agent run.
#[derive(Clone)]
pub struct MultiAgentConfig {
    pub chat: ChatClient,
    pub runner: GitRunner,
    /// Agents to run, in order.
    pub agents: Vec<AgentSpec>,
    pub timeout: Option<Duration>,
}

impl MultiAgentConfig {
    pub fn new(chat: ChatClient, agents: Vec<AgentSpec>) -> Self {
        Self {
            chat,
            runner: GitRunner::default(),
            agents,
            timeout: None,
        }
    }
}

/// Aggregated result of the multi-agent pipeline.
#[derive(Debug)]
pub struct MultiAgentReviewOutput {
    /// Raw per-agent outputs, successful agents only.
    pub agent_outputs: Vec<AgentReviewOutput>,
    /// Heuristically merged per-file reviews.
    pub merged_reviews: Vec<FileReview>,
}

/// Runs every configured agent against the whole PR and merges findings.
pub async fn generate_multi_agent_pr_review(
    input: &PRReviewInput,
    cfg: MultiAgentConfig,
) -> LampeResult<MultiAgentReviewOutput> {
    let inspector = GitInspector::with_runner(&input.repository.local_path, cfg.runner.clone());
    let files_changed = inspector
        .list_changed_files(&input.pull_request.base_commit_hash, &input.pull_request.head_commit_hash)
        .await?;

    let agent_input = AgentReviewInput {
        repository: input.repository.clone(),
        pull_request: input.pull_request.clone(),
        files_changed,
        review_depth: input.review_depth,
        custom_guidelines: input.custom_guidelines.clone(),
        target_file_path: None,
    };

    let mut agent_outputs = Vec::with_capacity(cfg.agents.len());
    for spec in &cfg.agents {
        debug!(agent = spec.name, "running agent review");
        let agent = SpecializedReviewAgent::new(*spec, cfg.chat.clone())
            .with_runner(cfg.runner.clone())
            .with_timeout(cfg.timeout);
        match agent.review(&agent_input).await {
            Ok(output) => {
                debug!(agent = spec.name, reviews = output.reviews.len(), "agent completed");
                agent_outputs.push(output);
            }
            Err(e) => {
                // One failing agent must not sink the rest.
                warn!(agent = spec.name, error = %e, "agent failed, continuing");
            }
        }
    }

    let merged_reviews = aggregate_agent_reviews(&agent_outputs);
    debug!(merged = merged_reviews.len(), "multi-agent pipeline complete");
    Ok(MultiAgentReviewOutput {
        agent_outputs,
        merged_reviews,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lampe_core::git::{GitOutput, ScriptedGit};
    use lampe_core::workflow::agent::scripted::ScriptedChat;
    use lampe_core::{PullRequest, Repository};
    use llm_service::ChatOutcome;

    use crate::agents::{CODE_QUALITY, SECURITY};
    use crate::data_models::ReviewDepth;

    #[tokio::test]
    async fn failing_agent_is_skipped() {
        let runner = ScriptedGit::new()
            .on("config core.sparseCheckout", GitOutput::failed(1, ""))
            .on("diff base head --numstat", GitOutput::ok("1\t0\ta.rs\n"))
            .on("diff base head --name-status", GitOutput::ok("M\ta.rs\n"))
            .on("cat-file -s head:a.rs", GitOutput::ok("100\n"));

        let chat = ScriptedChat::default()
            .fail_on("Security Reviewer", "vendor down")
            .reply_on(
                "Code Quality Reviewer",
                ChatOutcome::Message(
                    r#"{"reviews": [{"file_path": "a.rs", "line_comments": {"1": "dead code"}, "summary": "s"}], "summary": "ok"}"#.into(),
                ),
            );

        let input = PRReviewInput {
            repository: Repository {
                local_path: "/repo".into(),
                full_name: None,
            },
            pull_request: PullRequest::local("T", "base", "head"),
            review_depth: ReviewDepth::Standard,
            custom_guidelines: None,
            files_exclude_patterns: vec![],
            files_reinclude_patterns: vec![],
        };
        let cfg = MultiAgentConfig {
            chat: ChatClient::Scripted(chat),
            runner: GitRunner::Scripted(runner),
            agents: vec![SECURITY, CODE_QUALITY],
            timeout: None,
        };

        let out = generate_multi_agent_pr_review(&input, cfg).await.unwrap();
        assert_eq!(out.agent_outputs.len(), 1);
        assert_eq!(out.agent_outputs[0].agent_name, "Code Quality Reviewer");
        assert_eq!(out.merged_reviews.len(), 1);
        assert_eq!(out.merged_reviews[0].file_path, "a.rs");
    }
}
