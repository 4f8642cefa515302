//! Description orchestration: generate, then deliver.

use std::time::Duration;

use anyhow::Context;
use tracing::debug;

use lampe_core::git::GitRunner;
use lampe_core::{PullRequest, Repository};
use lampe_describe::generation::{PRDescriptionInput, generate_pr_description};
use lampe_describe::generation_agentic::generate_pr_description_agentic;
use lampe_providers::{PRDescriptionPayload, Provider};
use llm_service::ModelTier;

use crate::cli::DescribeVariant;
use crate::orchestrators::chat_for_tier;

pub struct DescriptionRun {
    pub repository: Repository,
    pub pull_request: PullRequest,
    pub variant: DescribeVariant,
    pub files_exclude_patterns: Vec<String>,
    pub files_reinclude_patterns: Vec<String>,
    pub truncation_tokens: usize,
    pub timeout: Option<Duration>,
}

/// Runs the selected description pipeline and delivers the result.
pub async fn run(run: DescriptionRun, provider: &Provider) -> anyhow::Result<String> {
    let chat = chat_for_tier(ModelTier::Mid)?;
    let input = PRDescriptionInput {
        repository: run.repository,
        pull_request: run.pull_request,
        files_exclude_patterns: run.files_exclude_patterns,
        files_reinclude_patterns: run.files_reinclude_patterns,
    };

    debug!(variant = ?run.variant, "generating PR description");
    let output = match run.variant {
        DescribeVariant::Default => {
            generate_pr_description(&input, &chat, GitRunner::default(), run.truncation_tokens)
                .await
                .context("generating PR description")?
        }
        DescribeVariant::Agentic => {
            generate_pr_description_agentic(&input, &chat, GitRunner::default(), run.timeout)
                .await
                .context("generating PR description (agentic)")?
        }
    };

    debug!(provider = provider.name(), "delivering PR description");
    provider
        .deliver_pr_description(&PRDescriptionPayload {
            description: output.description.clone(),
        })
        .await
        .context("delivering PR description")?;

    Ok(output.description)
}
