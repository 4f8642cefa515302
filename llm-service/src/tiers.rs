//! Model tier selection.
//!
//! Review depth maps to a logical tier (small/mid/large); the tier resolves
//! to a concrete model from env overrides or vendor defaults. OpenAI is
//! preferred when `OPENAI_API_KEY` is set, Anthropic otherwise.

use tracing::debug;

use crate::config::{LlmModelConfig, LlmProvider};
use crate::errors::{LlmError, LlmResult};

/// Logical model tier; exact model identifiers are configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    /// Cheapest model; basic reviews, aggregation passes.
    Small,
    /// Default model for standard reviews and descriptions.
    Mid,
    /// Strongest model; comprehensive reviews.
    Large,
}

impl ModelTier {
    fn env_override(self) -> &'static str {
        match self {
            Self::Small => "LAMPE_MODEL_SMALL",
            Self::Mid => "LAMPE_MODEL_MID",
            Self::Large => "LAMPE_MODEL_LARGE",
        }
    }

    fn default_model(self, provider: LlmProvider) -> &'static str {
        match (provider, self) {
            (LlmProvider::OpenAi, Self::Small) => "gpt-5-nano",
            (LlmProvider::OpenAi, Self::Mid) => "gpt-5-mini",
            (LlmProvider::OpenAi, Self::Large) => "gpt-5",
            (LlmProvider::Anthropic, Self::Small) => "claude-haiku-4-5",
            (LlmProvider::Anthropic, Self::Mid) => "claude-sonnet-4-5",
            (LlmProvider::Anthropic, Self::Large) => "claude-opus-4-1",
        }
    }
}

/// Resolves a tier to a full model config using the process environment.
///
/// # Errors
/// [`LlmError::MissingApiKey`] when neither `OPENAI_API_KEY` nor
/// `ANTHROPIC_API_KEY` is set.
pub fn resolve_tier_config(tier: ModelTier) -> LlmResult<LlmModelConfig> {
    let (provider, key) = if let Ok(k) = std::env::var("OPENAI_API_KEY") {
        (LlmProvider::OpenAi, k)
    } else if let Ok(k) = std::env::var("ANTHROPIC_API_KEY") {
        (LlmProvider::Anthropic, k)
    } else {
        return Err(LlmError::MissingApiKey("openai or anthropic"));
    };

    let model = std::env::var(tier.env_override())
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| tier.default_model(provider).to_string());

    debug!(?tier, %provider, %model, "resolved model tier");

    Ok(LlmModelConfig::for_model(provider, model, Some(key)))
}

/// Verifies that at least one vendor key is configured.
pub fn healthcheck() -> LlmResult<()> {
    if std::env::var("OPENAI_API_KEY").is_ok() || std::env::var("ANTHROPIC_API_KEY").is_ok() {
        Ok(())
    } else {
        Err(LlmError::MissingApiKey("openai or anthropic"))
    }
}
