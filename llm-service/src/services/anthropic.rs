//! Anthropic chat service (non-streaming, with tool use).
//!
//! Calls `POST {endpoint}/v1/messages`. The system prompt travels in the
//! top-level `system` field; tool results are sent as user-role
//! `tool_result` content blocks and tool requests come back as `tool_use`
//! blocks in the response content.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::chat::{ChatMessage, ChatOutcome, Role, ToolCallRequest, ToolDefinition};
use crate::config::{LlmModelConfig, LlmProvider};
use crate::errors::{LlmError, LlmResult, make_snippet};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Thin client for the Anthropic messages API.
#[derive(Debug)]
pub struct AnthropicService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_messages: String,
}

impl AnthropicService {
    /// Creates a new service from the given config.
    ///
    /// Validation mirrors [`super::open_ai::OpenAiService::new`].
    pub fn new(cfg: LlmModelConfig) -> LlmResult<Self> {
        if cfg.provider != LlmProvider::Anthropic {
            return Err(LlmError::InvalidProvider(cfg.provider.to_string()));
        }

        let api_key = cfg.api_key.clone().ok_or(LlmError::MissingApiKey("anthropic"))?;

        let endpoint = cfg.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(LlmError::InvalidEndpoint(cfg.endpoint.clone()));
        }

        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(300));

        let mut headers = header::HeaderMap::new();
        headers.insert(
            "x-api-key",
            header::HeaderValue::from_str(&api_key)
                .map_err(|e| LlmError::Decode(format!("invalid API key header: {e}")))?,
        );
        headers.insert(
            "anthropic-version",
            header::HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        let url_messages = format!("{}/v1/messages", endpoint.trim_end_matches('/'));

        info!(
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            "AnthropicService initialized"
        );

        Ok(Self { client, cfg, url_messages })
    }

    /// Performs one non-streaming messages call.
    pub async fn chat(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> LlmResult<ChatOutcome> {
        let started = Instant::now();
        let body = WireRequest::build(&self.cfg, messages, tools);

        debug!(
            model = %self.cfg.model,
            messages = messages.len(),
            tools = tools.len(),
            "POST {}", self.url_messages
        );

        let resp = self.client.post(&self.url_messages).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);
            error!(
                status,
                %snippet,
                model = %self.cfg.model,
                latency_ms = started.elapsed().as_millis(),
                "Anthropic messages call returned non-success status"
            );
            return Err(LlmError::HttpStatus {
                provider: "anthropic",
                status,
                snippet,
            });
        }

        let out: WireResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Decode(format!("serde error: {e}; expected `content` blocks")))?;

        if out.content.is_empty() {
            return Err(LlmError::EmptyResponse("anthropic"));
        }

        let mut text = String::new();
        let mut calls = Vec::new();
        for block in out.content {
            match block {
                WireBlock::Text { text: t } => {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(&t);
                }
                WireBlock::ToolUse { id, name, input } => {
                    calls.push(ToolCallRequest {
                        id,
                        name,
                        arguments: input,
                    });
                }
            }
        }

        info!(
            model = %self.cfg.model,
            latency_ms = started.elapsed().as_millis(),
            tool_calls = calls.len(),
            "messages call completed"
        );

        if calls.is_empty() {
            Ok(ChatOutcome::Message(text))
        } else {
            Ok(ChatOutcome::ToolCalls { text, calls })
        }
    }
}

/* ===========================================================================
HTTP payloads
======================================================================== */

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
}

impl<'a> WireRequest<'a> {
    fn build(cfg: &'a LlmModelConfig, messages: &[ChatMessage], tools: &'a [ToolDefinition]) -> Self {
        // System messages are hoisted into the top-level field.
        let system = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.clone())
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut wire = Vec::new();
        for m in messages.iter().filter(|m| m.role != Role::System) {
            match m.role {
                Role::User => wire.push(WireMessage::text("user", &m.content)),
                Role::Assistant => {
                    let mut blocks = Vec::new();
                    if !m.content.is_empty() {
                        blocks.push(WireBlockOut::Text {
                            text: m.content.clone(),
                        });
                    }
                    for tc in &m.tool_calls {
                        blocks.push(WireBlockOut::ToolUse {
                            id: tc.id.clone(),
                            name: tc.name.clone(),
                            input: tc.arguments.clone(),
                        });
                    }
                    wire.push(WireMessage {
                        role: "assistant",
                        content: blocks,
                    });
                }
                Role::Tool => {
                    // Tool results are user-role tool_result blocks.
                    wire.push(WireMessage {
                        role: "user",
                        content: vec![WireBlockOut::ToolResult {
                            tool_use_id: m.tool_call_id.clone().unwrap_or_default(),
                            content: m.content.clone(),
                        }],
                    });
                }
                Role::System => unreachable!("filtered above"),
            }
        }

        Self {
            model: &cfg.model,
            max_tokens: cfg.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: if system.is_empty() { None } else { Some(system) },
            messages: wire,
            temperature: cfg.temperature,
            tools: tools.iter().map(WireTool::from_def).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: Vec<WireBlockOut>,
}

impl WireMessage {
    fn text(role: &'static str, content: &str) -> Self {
        Self {
            role,
            content: vec![WireBlockOut::Text {
                text: content.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireBlockOut {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
    ToolResult { tool_use_id: String, content: String },
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

impl<'a> WireTool<'a> {
    fn from_def(def: &'a ToolDefinition) -> Self {
        Self {
            name: &def.name,
            description: &def.description,
            input_schema: &def.parameters,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    content: Vec<WireBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::Anthropic,
            model: "claude-sonnet-4-5".into(),
            endpoint: "https://api.anthropic.com".into(),
            api_key: Some("key".into()),
            max_tokens: None,
            temperature: None,
            timeout_secs: Some(30),
        }
    }

    #[test]
    fn system_messages_hoisted() {
        let messages = vec![ChatMessage::system("rules"), ChatMessage::user("hi")];
        let model_cfg = cfg();
        let body = WireRequest::build(&model_cfg, &messages, &[]);
        assert_eq!(body.system.as_deref(), Some("rules"));
        assert_eq!(body.messages.len(), 1);
        assert_eq!(body.messages[0].role, "user");
    }

    #[test]
    fn tool_result_becomes_user_block() {
        let messages = vec![
            ChatMessage::user("go"),
            ChatMessage::tool("toolu_1", "search_in_files", "hits"),
        ];
        let model_cfg = cfg();
        let body = WireRequest::build(&model_cfg, &messages, &[]);
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["messages"][1]["role"], "user");
        assert_eq!(v["messages"][1]["content"][0]["type"], "tool_result");
        assert_eq!(v["messages"][1]["content"][0]["tool_use_id"], "toolu_1");
    }

    #[test]
    fn tool_use_blocks_decode() {
        let raw = serde_json::json!({
            "content": [
                {"type": "text", "text": "checking"},
                {"type": "tool_use", "id": "toolu_2", "name": "get_diff_for_files", "input": {"file_paths": ["a.rs"]}}
            ]
        });
        let resp: WireResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(resp.content.len(), 2);
        assert!(matches!(&resp.content[1], WireBlock::ToolUse { name, .. } if name == "get_diff_for_files"));
    }
}
