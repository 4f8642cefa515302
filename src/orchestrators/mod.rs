//! Orchestrators: run a generation pipeline, then hand the artifact to the
//! configured provider.

pub mod pr_description;
pub mod pr_review;

use std::sync::Arc;

use anyhow::Context;

use lampe_core::workflow::agent::ChatClient;
use llm_service::{LlmClient, ModelTier, resolve_tier_config};

use crate::cli::DepthArg;
use lampe_review::ReviewDepth;

/// Builds a chat client for a logical model tier.
pub fn chat_for_tier(tier: ModelTier) -> anyhow::Result<ChatClient> {
    let cfg = resolve_tier_config(tier).context("resolving LLM configuration")?;
    let client = LlmClient::from_config(cfg).context("building LLM client")?;
    Ok(ChatClient::Llm(Arc::new(client)))
}

/// Review depth → model tier for the review agents.
pub fn tier_for_depth(depth: ReviewDepth) -> ModelTier {
    match depth {
        ReviewDepth::Basic => ModelTier::Small,
        ReviewDepth::Standard => ModelTier::Mid,
        ReviewDepth::Comprehensive => ModelTier::Large,
    }
}

impl From<DepthArg> for ReviewDepth {
    fn from(arg: DepthArg) -> Self {
        match arg {
            DepthArg::Basic => Self::Basic,
            DepthArg::Standard => Self::Standard,
            DepthArg::Comprehensive => Self::Comprehensive,
        }
    }
}
