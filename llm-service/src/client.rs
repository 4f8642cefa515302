//! Vendor dispatch.
//!
//! `LlmClient` is a thin enum over the concrete services so pipeline code
//! holds one concrete type and async fns stay unboxed.

use crate::chat::{ChatMessage, ChatOutcome, ToolDefinition};
use crate::config::{LlmModelConfig, LlmProvider};
use crate::errors::LlmResult;
use crate::services::{anthropic::AnthropicService, open_ai::OpenAiService};

/// Concrete LLM client (enum-dispatch).
#[derive(Debug)]
pub enum LlmClient {
    OpenAi(OpenAiService),
    Anthropic(AnthropicService),
}

impl LlmClient {
    /// Constructs a concrete client from generic config.
    pub fn from_config(cfg: LlmModelConfig) -> LlmResult<Self> {
        Ok(match cfg.provider {
            LlmProvider::OpenAi => Self::OpenAi(OpenAiService::new(cfg)?),
            LlmProvider::Anthropic => Self::Anthropic(AnthropicService::new(cfg)?),
        })
    }

    /// One chat turn: either a final message or a set of tool calls.
    pub async fn chat(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> LlmResult<ChatOutcome> {
        match self {
            Self::OpenAi(c) => c.chat(messages, tools).await,
            Self::Anthropic(c) => c.chat(messages, tools).await,
        }
    }
}
