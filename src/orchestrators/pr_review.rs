//! Review orchestration: generate, then deliver.

use std::time::Duration;

use anyhow::Context;
use tracing::debug;

use lampe_core::{PullRequest, Repository};
use lampe_providers::{PRReviewPayload, Provider};
use lampe_review::agents;
use lampe_review::data_models::{AgentReviewOutput, PRReviewInput, ReviewDepth};
use lampe_review::diff_by_diff::{DiffByDiffConfig, generate_diff_by_diff_pr_review};
use lampe_review::multi_agent::{MultiAgentConfig, generate_multi_agent_pr_review};
use llm_service::ModelTier;

use crate::cli::ReviewVariant;
use crate::orchestrators::{chat_for_tier, tier_for_depth};

pub struct ReviewRun {
    pub repository: Repository,
    pub pull_request: PullRequest,
    pub variant: ReviewVariant,
    pub review_depth: ReviewDepth,
    pub custom_guidelines: Vec<String>,
    pub files_exclude_patterns: Vec<String>,
    pub timeout: Option<Duration>,
}

/// Runs the selected review pipeline and delivers the result.
pub async fn run(run: ReviewRun, provider: &Provider) -> anyhow::Result<Vec<AgentReviewOutput>> {
    let input = PRReviewInput {
        repository: run.repository,
        pull_request: run.pull_request,
        review_depth: run.review_depth,
        custom_guidelines: if run.custom_guidelines.is_empty() {
            None
        } else {
            Some(run.custom_guidelines)
        },
        files_exclude_patterns: run.files_exclude_patterns,
        files_reinclude_patterns: Vec::new(),
    };

    debug!(variant = ?run.variant, depth = %input.review_depth, "generating PR review");
    let reviews = match run.variant {
        ReviewVariant::DiffByDiff => {
            let mut cfg = DiffByDiffConfig::new(
                chat_for_tier(tier_for_depth(input.review_depth))?,
                chat_for_tier(ModelTier::Small)?,
            );
            cfg.timeout = run.timeout;
            generate_diff_by_diff_pr_review(&input, cfg)
                .await
                .context("running diff-by-diff review pipeline")?
                .reviews
        }
        ReviewVariant::MultiAgent => {
            let cfg = MultiAgentConfig {
                chat: chat_for_tier(tier_for_depth(input.review_depth))?,
                runner: Default::default(),
                agents: vec![agents::DEFAULT],
                timeout: run.timeout,
            };
            let output = generate_multi_agent_pr_review(&input, cfg)
                .await
                .context("running multi-agent review pipeline")?;
            // The sink consumes per-agent outputs; wrap the merged per-file
            // reviews into a single synthetic agent section.
            let agent_names: Vec<String> = output.agent_outputs.iter().map(|a| a.agent_name.clone()).collect();
            vec![AgentReviewOutput {
                agent_name: "Multi-Agent Review".to_string(),
                focus_areas: agent_names,
                reviews: output.merged_reviews,
                sources: Vec::new(),
                summary: String::new(),
            }]
        }
    };

    debug!(provider = provider.name(), reviews = reviews.len(), "delivering PR review");
    provider
        .deliver_pr_review(&PRReviewPayload {
            reviews: reviews.clone(),
        })
        .await
        .context("delivering PR review")?;

    Ok(reviews)
}
