//! OpenAI chat service (non-streaming, with function calling).
//!
//! Calls `POST {endpoint}/v1/chat/completions`. Tool definitions are passed
//! through as `tools: [{type: "function", function: {...}}]` and tool call
//! requests come back in `choices[0].message.tool_calls`.
//!
//! Constructor validation:
//! - `cfg.provider` must be [`LlmProvider::OpenAi`]
//! - `cfg.api_key` must be present
//! - `cfg.endpoint` must start with http:// or https://

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::chat::{ChatMessage, ChatOutcome, Role, ToolCallRequest, ToolDefinition};
use crate::config::{LlmModelConfig, LlmProvider};
use crate::errors::{LlmError, LlmResult, make_snippet};

/// Thin client for the OpenAI chat completions API.
#[derive(Debug)]
pub struct OpenAiService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_chat: String,
}

impl OpenAiService {
    /// Creates a new service from the given config.
    ///
    /// # Errors
    /// - [`LlmError::InvalidProvider`] if `cfg.provider` is not OpenAI
    /// - [`LlmError::MissingApiKey`] if no key is configured
    /// - [`LlmError::InvalidEndpoint`] if the endpoint scheme is invalid
    pub fn new(cfg: LlmModelConfig) -> LlmResult<Self> {
        if cfg.provider != LlmProvider::OpenAi {
            return Err(LlmError::InvalidProvider(cfg.provider.to_string()));
        }

        let api_key = cfg.api_key.clone().ok_or(LlmError::MissingApiKey("openai"))?;

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
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| LlmError::Decode(format!("invalid API key header: {e}")))?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        let url_chat = format!("{}/v1/chat/completions", endpoint.trim_end_matches('/'));

        info!(
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            timeout_secs = cfg.timeout_secs.unwrap_or(300),
            "OpenAiService initialized"
        );

        Ok(Self { client, cfg, url_chat })
    }

    /// Performs one non-streaming chat completion.
    ///
    /// # Errors
    /// - [`LlmError::HttpStatus`] for non-2xx responses
    /// - [`LlmError::Transport`] for network failures
    /// - [`LlmError::Decode`] if the JSON does not parse
    /// - [`LlmError::EmptyResponse`] if no choices are returned
    pub async fn chat(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> LlmResult<ChatOutcome> {
        let started = Instant::now();
        let body = WireRequest::build(&self.cfg, messages, tools);

        debug!(
            model = %self.cfg.model,
            messages = messages.len(),
            tools = tools.len(),
            "POST {}", self.url_chat
        );

        let resp = self.client.post(&self.url_chat).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);
            error!(
                status,
                %snippet,
                model = %self.cfg.model,
                latency_ms = started.elapsed().as_millis(),
                "OpenAI chat completion returned non-success status"
            );
            return Err(LlmError::HttpStatus {
                provider: "openai",
                status,
                snippet,
            });
        }

        let out: WireResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Decode(format!("serde error: {e}; expected `choices[0].message`")))?;

        let message = out
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or(LlmError::EmptyResponse("openai"))?;

        info!(
            model = %self.cfg.model,
            latency_ms = started.elapsed().as_millis(),
            tool_calls = message.tool_calls.len(),
            "chat completion completed"
        );

        let text = message.content.unwrap_or_default();
        if message.tool_calls.is_empty() {
            return Ok(ChatOutcome::Message(text));
        }

        let mut calls = Vec::with_capacity(message.tool_calls.len());
        for tc in message.tool_calls {
            // Arguments arrive as a JSON-encoded string.
            let arguments: Value = serde_json::from_str(&tc.function.arguments)
                .map_err(|e| LlmError::Decode(format!("tool call arguments: {e}")))?;
            calls.push(ToolCallRequest {
                id: tc.id,
                name: tc.function.name,
                arguments,
            });
        }
        Ok(ChatOutcome::ToolCalls { text, calls })
    }
}

/* ===========================================================================
HTTP payloads
======================================================================== */

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
}

impl<'a> WireRequest<'a> {
    fn build(cfg: &'a LlmModelConfig, messages: &'a [ChatMessage], tools: &'a [ToolDefinition]) -> Self {
        Self {
            model: &cfg.model,
            messages: messages.iter().map(WireMessage::from_chat).collect(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            tools: tools.iter().map(WireTool::from_def).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCallOut<'a>>,
}

impl<'a> WireMessage<'a> {
    fn from_chat(m: &'a ChatMessage) -> Self {
        let role = match m.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        Self {
            role,
            content: Some(m.content.as_str()),
            tool_call_id: m.tool_call_id.as_deref(),
            tool_calls: m.tool_calls.iter().map(WireToolCallOut::from_req).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct WireToolCallOut<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionOut<'a>,
}

#[derive(Debug, Serialize)]
struct WireFunctionOut<'a> {
    name: &'a str,
    arguments: String,
}

impl<'a> WireToolCallOut<'a> {
    fn from_req(req: &'a ToolCallRequest) -> Self {
        Self {
            id: &req.id,
            kind: "function",
            function: WireFunctionOut {
                name: &req.name,
                arguments: req.arguments.to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionDef<'a>,
}

#[derive(Debug, Serialize)]
struct WireFunctionDef<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

impl<'a> WireTool<'a> {
    fn from_def(def: &'a ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: WireFunctionDef {
                name: &def.name,
                description: &def.description,
                parameters: &def.parameters,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessageIn,
}

#[derive(Debug, Deserialize)]
struct WireMessageIn {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCallIn>,
}

#[derive(Debug, Deserialize)]
struct WireToolCallIn {
    id: String,
    function: WireFunctionIn,
}

#[derive(Debug, Deserialize)]
struct WireFunctionIn {
    name: String,
    arguments: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::OpenAi,
            model: "gpt-5-nano".into(),
            endpoint: "https://api.openai.com".into(),
            api_key: Some("sk-test".into()),
            max_tokens: Some(2048),
            temperature: Some(1.0),
            timeout_secs: Some(30),
        }
    }

    #[test]
    fn rejects_wrong_provider() {
        let mut c = cfg();
        c.provider = LlmProvider::Anthropic;
        assert!(matches!(OpenAiService::new(c), Err(LlmError::InvalidProvider(_))));
    }

    #[test]
    fn rejects_missing_key() {
        let mut c = cfg();
        c.api_key = None;
        assert!(matches!(OpenAiService::new(c), Err(LlmError::MissingApiKey(_))));
    }

    #[test]
    fn rejects_bad_endpoint() {
        let mut c = cfg();
        c.endpoint = "ftp://example.com".into();
        assert!(matches!(OpenAiService::new(c), Err(LlmError::InvalidEndpoint(_))));
    }

    #[test]
    fn request_serializes_tool_definitions() {
        let c = cfg();
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("hi")];
        let tools = vec![ToolDefinition {
            name: "search_in_files".into(),
            description: "grep".into(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        }];
        let body = WireRequest::build(&c, &messages, &tools);
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["tools"][0]["type"], "function");
        assert_eq!(v["tools"][0]["function"]["name"], "search_in_files");
        assert_eq!(v["messages"][0]["role"], "system");
    }

    #[test]
    fn response_with_tool_calls_decodes() {
        let raw = serde_json::json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {
                            "name": "get_diff_for_files",
                            "arguments": "{\"base_reference\": \"abc\"}"
                        }
                    }]
                }
            }]
        });
        let resp: WireResponse = serde_json::from_value(raw).unwrap();
        let message = &resp.choices[0].message;
        assert!(message.content.is_none());
        assert_eq!(message.tool_calls[0].function.name, "get_diff_for_files");
        let args: Value = serde_json::from_str(&message.tool_calls[0].function.arguments).unwrap();
        assert_eq!(args["base_reference"], "abc");
    }

    #[test]
    fn tool_result_message_carries_call_id() {
        let m = ChatMessage::tool("call_1", "search_in_files", "out");
        let wire = WireMessage::from_chat(&m);
        let v = serde_json::to_value(&wire).unwrap();
        assert_eq!(v["role"], "tool");
        assert_eq!(v["tool_call_id"], "call_1");
    }
}
