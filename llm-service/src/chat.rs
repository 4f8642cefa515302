//! Vendor-neutral chat types.
//!
//! The pipelines build conversations out of these types; each concrete
//! service translates them to its own wire format (OpenAI chat completions
//! or Anthropic messages).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One turn of a conversation.
///
/// Tool result messages carry the id of the call they answer; assistant
/// messages that requested tool calls carry those requests so the history
/// round-trips through the vendor APIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Id of the tool call this message answers (tool messages only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Name of the tool that produced this message (tool messages only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Tool calls requested by this assistant message, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Tool output answering `call_id`, attributed to `tool_name`.
    pub fn tool(call_id: impl Into<String>, tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_call_id: Some(call_id.into()),
            tool_name: Some(tool_name.into()),
            tool_calls: Vec::new(),
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_call_id: None,
            tool_name: None,
            tool_calls: Vec::new(),
        }
    }
}

/// A tool the model may call, described by name and a JSON-schema object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema for the arguments object.
    pub parameters: Value,
}

/// A single tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    /// Arguments object as supplied by the model.
    pub arguments: Value,
}

/// Result of one chat call.
#[derive(Debug, Clone)]
pub enum ChatOutcome {
    /// Final assistant reply with no tool calls.
    Message(String),
    /// The model requested one or more tool invocations; `text` carries any
    /// interleaved assistant text that accompanied the calls.
    ToolCalls { text: String, calls: Vec<ToolCallRequest> },
}

impl ChatOutcome {
    /// The assistant message to append to the history for this outcome.
    pub fn to_assistant_message(&self) -> ChatMessage {
        match self {
            Self::Message(text) => ChatMessage::assistant(text.clone()),
            Self::ToolCalls { text, calls } => ChatMessage {
                role: Role::Assistant,
                content: text.clone(),
                tool_call_id: None,
                tool_name: None,
                tool_calls: calls.clone(),
            },
        }
    }
}
