//! Diff-by-diff parallel review pipeline.
//!
//! One diff-focused agent per changed file, fanned over a bounded worker
//! pool; a failing agent becomes a sentinel and its siblings keep running.
//! Collected reviews go through one LLM aggregation pass; if that pass
//! fails to parse, the pre-aggregation reviews are delivered unchanged.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use lampe_core::errors::LampeResult;
use lampe_core::git::diff::filter_changed_paths;
use lampe_core::git::{GitInspector, GitRunner};
use lampe_core::workflow::agent::ChatClient;
use lampe_core::workflow::parallel::{InnerResult, max_workers, run_parallel};

use crate::agents::{DIFF_FOCUSED, SpecializedReviewAgent};
use crate::aggregation::aggregate_reviews;
use crate::data_models::{AgentReviewInput, AgentReviewOutput, PRReviewInput, PRReviewOutput};

/// Wiring for one pipeline run.
#[derive(Clone)]
pub struct DiffByDiffConfig {
    /// Chat client for the per-file agents (tier selected by review depth).
    pub agent_chat: ChatClient,
    /// Chat client for the aggregation pass.
    pub aggregation_chat: ChatClient,
    /// Git runner handed to agents and the enumerator.
    pub runner: GitRunner,
    /// Worker cap for concurrent agents.
    pub max_workers: usize,
    /// Global deadline applied to the fan-out stage.
    pub timeout: Option<Duration>,
}

impl DiffByDiffConfig {
    pub fn new(agent_chat: ChatClient, aggregation_chat: ChatClient) -> Self {
        Self {
            agent_chat,
            aggregation_chat,
            runner: GitRunner::default(),
            max_workers: max_workers(),
            timeout: None,
        }
    }
}

/// Runs the full pipeline for one PR.
pub async fn generate_diff_by_diff_pr_review(
    input: &PRReviewInput,
    cfg: DiffByDiffConfig,
) -> LampeResult<PRReviewOutput> {
    let t0 = Instant::now();
    let inspector = GitInspector::with_runner(&input.repository.local_path, cfg.runner.clone());

    // Enumerate and filter changed files.
    let file_diffs = inspector
        .list_changed_files_as_objects(&input.pull_request.base_commit_hash, &input.pull_request.head_commit_hash)
        .await?;
    let changed_paths: Vec<String> = file_diffs.iter().map(|f| f.file_path.clone()).collect();
    let surviving = filter_changed_paths(
        changed_paths,
        &[],
        &input.files_exclude_patterns,
        &input.files_reinclude_patterns,
    );

    if surviving.is_empty() {
        debug!("no files to review after filtering");
        return Ok(PRReviewOutput { reviews: vec![] });
    }
    debug!(files = surviving.len(), "starting parallel review of file diffs");

    let files_changed = inspector
        .list_changed_files(&input.pull_request.base_commit_hash, &input.pull_request.head_commit_hash)
        .await?;

    // One agent input per surviving file.
    let agent_inputs: Vec<AgentReviewInput> = surviving
        .into_iter()
        .map(|file_path| AgentReviewInput {
            repository: input.repository.clone(),
            pull_request: input.pull_request.clone(),
            files_changed: files_changed.clone(),
            review_depth: input.review_depth,
            custom_guidelines: input.custom_guidelines.clone(),
            target_file_path: Some(file_path),
        })
        .collect();
    let dispatched = agent_inputs.len();

    // Fan out over the worker pool; failures become sentinels.
    let agent_chat = cfg.agent_chat.clone();
    let runner = cfg.runner.clone();
    let timeout = cfg.timeout;
    let results = run_parallel(
        agent_inputs,
        cfg.max_workers,
        cfg.timeout,
        move |agent_input: AgentReviewInput| {
            let agent = SpecializedReviewAgent::new(DIFF_FOCUSED, agent_chat.clone())
                .with_runner(runner.clone())
                .with_timeout(timeout);
            async move { agent.review_diff(&agent_input).await }
        },
    )
    .await?;

    let agent_reviews: Vec<AgentReviewOutput> = results.into_iter().filter_map(InnerResult::into_ok).collect();
    debug!(
        completed = agent_reviews.len(),
        dispatched, "completed parallel reviews"
    );

    if agent_reviews.is_empty() {
        return Ok(PRReviewOutput { reviews: vec![] });
    }

    // Aggregation pass (falls back to the raw reviews on parse failure).
    let aggregated = aggregate_reviews(&cfg.aggregation_chat, agent_reviews, &files_changed).await?;

    info!(
        reviews = aggregated.len(),
        elapsed_ms = t0.elapsed().as_millis(),
        "diff-by-diff pipeline complete"
    );
    Ok(PRReviewOutput { reviews: aggregated })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lampe_core::git::{GitOutput, ScriptedGit};
    use lampe_core::workflow::agent::scripted::ScriptedChat;
    use lampe_core::{PullRequest, Repository};
    use llm_service::ChatOutcome;

    use crate::data_models::ReviewDepth;

    fn review_json(path: &str) -> String {
        format!(
            r#"{{"reviews": [{{"file_path": "{path}", "line_comments": {{"1": "bug"}}, "summary": "found"}}], "summary": "done"}}"#
        )
    }

    fn scripted_repo() -> ScriptedGit {
        ScriptedGit::new()
            .on("config core.sparseCheckout", GitOutput::failed(1, ""))
            .on(
                "diff base head --numstat",
                GitOutput::ok("1\t0\ta.rs\n1\t0\tb.rs\n1\t0\tc.rs\n"),
            )
            .on(
                "diff base head --name-status",
                GitOutput::ok("M\ta.rs\nM\tb.rs\nM\tc.rs\n"),
            )
            .on("cat-file -s head:a.rs", GitOutput::ok("100\n"))
            .on("cat-file -s head:b.rs", GitOutput::ok("100\n"))
            .on("cat-file -s head:c.rs", GitOutput::ok("100\n"))
            .on("diff base head -- a.rs", GitOutput::ok("-x\n+y\n"))
            .on("diff base head -- b.rs", GitOutput::ok("-x\n+y\n"))
            .on("diff base head -- c.rs", GitOutput::ok("-x\n+y\n"))
    }

    fn pipeline_input() -> PRReviewInput {
        PRReviewInput {
            repository: Repository {
                local_path: "/repo".into(),
                full_name: None,
            },
            pull_request: PullRequest::local("Title", "base", "head"),
            review_depth: ReviewDepth::Standard,
            custom_guidelines: None,
            files_exclude_patterns: vec![],
            files_reinclude_patterns: vec![],
        }
    }

    #[tokio::test]
    async fn failed_agent_is_absent_from_output() {
        let agent_chat = ScriptedChat::default()
            .reply_on(
                "assigned file to review: a.rs",
                ChatOutcome::Message(review_json("a.rs")),
            )
            .fail_on("assigned file to review: b.rs", "agent exploded")
            .reply_on(
                "assigned file to review: c.rs",
                ChatOutcome::Message(review_json("c.rs")),
            );
        // Aggregation reply that does not parse: pipeline falls back to the
        // two surviving reviews.
        let aggregation_chat = ScriptedChat::new(vec![ChatOutcome::Message("not json".into())]);

        let cfg = DiffByDiffConfig {
            agent_chat: ChatClient::Scripted(agent_chat),
            aggregation_chat: ChatClient::Scripted(aggregation_chat),
            runner: GitRunner::Scripted(scripted_repo()),
            max_workers: 4,
            timeout: None,
        };

        let out = generate_diff_by_diff_pr_review(&pipeline_input(), cfg).await.unwrap();
        assert_eq!(out.reviews.len(), 2);
        let mentioned: Vec<&str> = out
            .reviews
            .iter()
            .flat_map(|r| r.reviews.iter().map(|fr| fr.file_path.as_str()))
            .collect();
        assert!(mentioned.contains(&"a.rs"));
        assert!(mentioned.contains(&"c.rs"));
        assert!(!mentioned.contains(&"b.rs"));
    }

    #[tokio::test]
    async fn exclusion_can_empty_the_pipeline() {
        let cfg = DiffByDiffConfig {
            agent_chat: ChatClient::Scripted(ScriptedChat::default()),
            aggregation_chat: ChatClient::Scripted(ScriptedChat::default()),
            runner: GitRunner::Scripted(scripted_repo()),
            max_workers: 4,
            timeout: None,
        };
        let mut input = pipeline_input();
        input.files_exclude_patterns = vec!["*.rs".into()];
        let out = generate_diff_by_diff_pr_review(&input, cfg).await.unwrap();
        assert!(out.reviews.is_empty());
    }

    #[tokio::test]
    async fn reinclude_rescues_excluded_files() {
        let agent_chat = ScriptedChat::default().reply_on(
            "assigned file to review: a.rs",
            ChatOutcome::Message(review_json("a.rs")),
        );
        let aggregation_chat = ScriptedChat::new(vec![ChatOutcome::Message("broken".into())]);
        let cfg = DiffByDiffConfig {
            agent_chat: ChatClient::Scripted(agent_chat),
            aggregation_chat: ChatClient::Scripted(aggregation_chat),
            runner: GitRunner::Scripted(scripted_repo()),
            max_workers: 4,
            timeout: None,
        };
        let mut input = pipeline_input();
        input.files_exclude_patterns = vec!["*.rs".into()];
        input.files_reinclude_patterns = vec!["a.rs".into()];
        let out = generate_diff_by_diff_pr_review(&input, cfg).await.unwrap();
        assert_eq!(out.reviews.len(), 1);
        assert_eq!(out.reviews[0].reviews[0].file_path, "a.rs");
    }
}
