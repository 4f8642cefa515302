//! Model invocation configuration.

use std::fmt;

/// Which vendor backend to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Anthropic => write!(f, "anthropic"),
        }
    }
}

/// Configuration for an LLM model invocation.
///
/// Covers both vendors; provider-specific knobs stay optional.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmModelConfig {
    /// Vendor backend.
    pub provider: LlmProvider,
    /// Model identifier (e.g. `"gpt-5-nano"`, `"claude-sonnet-4-5"`).
    pub model: String,
    /// API base URL (e.g. `"https://api.openai.com"`).
    pub endpoint: String,
    /// API key; required by both vendors.
    pub api_key: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl LlmModelConfig {
    /// Config with vendor defaults for endpoint and limits.
    pub fn for_model(provider: LlmProvider, model: impl Into<String>, api_key: Option<String>) -> Self {
        let endpoint = match provider {
            LlmProvider::OpenAi => "https://api.openai.com".to_string(),
            LlmProvider::Anthropic => "https://api.anthropic.com".to_string(),
        };
        Self {
            provider,
            model: model.into(),
            endpoint,
            api_key,
            max_tokens: None,
            temperature: None,
            timeout_secs: Some(300),
        }
    }
}
