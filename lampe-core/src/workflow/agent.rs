//! Function-calling agent loop.
//!
//! States: prepare history → call LLM → (tool calls | complete). Tool
//! calls are dispatched serially within a turn so the chat history stays
//! consistent; their outputs are appended as tool messages and the loop
//! returns to the LLM. The loop ends when the reply carries no tool calls.
//!
//! There is no intrinsic turn cap; callers bound the run with the workflow
//! timeout.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Map;
use tracing::debug;

use llm_service::{ChatMessage, ChatOutcome, LlmClient, ToolDefinition};

use crate::errors::{Error, LampeResult, ToolError};
use crate::tools::{ToolRegistry, ToolSource};
use crate::workflow::memory::ChatMemory;
use crate::workflow::Workflow;

/// Chat dispatch for the agent loop. The scripted variant replays canned
/// outcomes and exists for tests.
#[derive(Clone)]
pub enum ChatClient {
    Llm(Arc<LlmClient>),
    Scripted(scripted::ScriptedChat),
}

impl ChatClient {
    pub async fn chat(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> LampeResult<ChatOutcome> {
        match self {
            Self::Llm(client) => Ok(client.chat(messages, tools).await?),
            Self::Scripted(s) => s.chat(messages),
        }
    }
}

/// Final output of one agent run.
#[derive(Debug)]
pub struct AgentRunOutput {
    /// The model's final reply text.
    pub output: Option<String>,
    /// Trace of every successful tool call, in dispatch order.
    pub sources: Vec<ToolSource>,
}

#[derive(Debug)]
enum AgentEvent {
    Start(String),
    Input(Vec<ChatMessage>),
    ToolCalls(Vec<llm_service::ToolCallRequest>),
    Complete {
        output: Option<String>,
        sources: Vec<ToolSource>,
    },
}

struct AgentShared {
    chat: ChatClient,
    registry: ToolRegistry,
    tool_defs: Vec<ToolDefinition>,
    system_prompt: Option<String>,
}

/// An LLM driven by repository tools until it emits a final answer.
pub struct FunctionCallingAgent {
    shared: Arc<AgentShared>,
    timeout: Option<Duration>,
}

impl FunctionCallingAgent {
    pub fn new(chat: ChatClient, registry: ToolRegistry, system_prompt: Option<String>) -> Self {
        let tool_defs = registry.definitions();
        Self {
            shared: Arc::new(AgentShared {
                chat,
                registry,
                tool_defs,
                system_prompt,
            }),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Rebinds tool partial params (the only repo-binding path). Installed
    /// before the first LLM call of a run.
    pub fn update_tools(&mut self, partial_params: Map<String, serde_json::Value>) {
        let shared = Arc::get_mut(&mut self.shared)
            .expect("update_tools must be called before the agent is shared with a run");
        shared.registry.set_partial_params(partial_params);
    }

    /// Runs the loop for one user input.
    pub async fn run(&self, input: impl Into<String>) -> LampeResult<AgentRunOutput> {
        let prepare_shared = self.shared.clone();
        let llm_shared = self.shared.clone();
        let tools_shared = self.shared.clone();

        let workflow = Workflow::<AgentEvent>::builder(|e| matches!(e, AgentEvent::Complete { .. }))
            .step(
                "prepare_chat_history",
                |e| matches!(e, AgentEvent::Start(_)),
                move |ctx, ev| {
                    let shared = prepare_shared.clone();
                    async move {
                        let AgentEvent::Start(input) = ev else { unreachable!() };
                        let mut memory = ChatMemory::default();
                        if let Some(system) = &shared.system_prompt {
                            memory.push(ChatMessage::system(system.clone()));
                        }
                        memory.push(ChatMessage::user(input));
                        let history = memory.snapshot();
                        ctx.set("memory", memory).await;
                        ctx.set("sources", Vec::<ToolSource>::new()).await;
                        Ok(vec![AgentEvent::Input(history)])
                    }
                },
            )
            .step(
                "handle_llm_input",
                |e| matches!(e, AgentEvent::Input(_)),
                move |ctx, ev| {
                    let shared = llm_shared.clone();
                    async move {
                        let AgentEvent::Input(history) = ev else { unreachable!() };
                        let outcome = shared.chat.chat(&history, &shared.tool_defs).await?;

                        let mut memory: ChatMemory = ctx.take("memory").await.unwrap_or_default();
                        memory.push(outcome.to_assistant_message());
                        ctx.set("memory", memory).await;

                        match outcome {
                            ChatOutcome::Message(text) => {
                                let sources = ctx.take::<Vec<ToolSource>>("sources").await.unwrap_or_default();
                                Ok(vec![AgentEvent::Complete {
                                    output: Some(text),
                                    sources,
                                }])
                            }
                            ChatOutcome::ToolCalls { calls, .. } => Ok(vec![AgentEvent::ToolCalls(calls)]),
                        }
                    }
                },
            )
            .step(
                "handle_tool_calls",
                |e| matches!(e, AgentEvent::ToolCalls(_)),
                move |ctx, ev| {
                    let shared = tools_shared.clone();
                    async move {
                        let AgentEvent::ToolCalls(calls) = ev else { unreachable!() };
                        let mut sources = ctx.take::<Vec<ToolSource>>("sources").await.unwrap_or_default();
                        let mut tool_messages = Vec::with_capacity(calls.len());

                        for call in calls {
                            debug!(tool = %call.name, kwargs = %call.arguments, "dispatching tool call");
                            match shared.registry.dispatch(&call.name, &call.arguments).await {
                                Ok(output) => {
                                    debug!(tool = %call.name, output_len = output.content.len(), "tool call ok");
                                    sources.push(ToolSource {
                                        tool_name: call.name.clone(),
                                        tool_kwargs: call.arguments.clone(),
                                        tool_output: output.content.clone(),
                                    });
                                    tool_messages.push(ChatMessage::tool(call.id, call.name, output.content));
                                }
                                Err(Error::Tool(ToolError::UnknownTool(name))) => {
                                    tool_messages.push(ChatMessage::tool(
                                        call.id,
                                        call.name,
                                        format!("Tool {name} does not exist"),
                                    ));
                                }
                                Err(e) => {
                                    tool_messages.push(ChatMessage::tool(
                                        call.id,
                                        call.name,
                                        format!("Encountered error in tool call: {e}"),
                                    ));
                                }
                            }
                        }

                        let mut memory: ChatMemory = ctx.take("memory").await.unwrap_or_default();
                        for message in tool_messages {
                            memory.push(message);
                        }
                        let history = memory.snapshot();
                        ctx.set("memory", memory).await;
                        ctx.set("sources", sources).await;
                        Ok(vec![AgentEvent::Input(history)])
                    }
                },
            )
            .timeout(self.timeout)
            .build();

        match workflow.run(AgentEvent::Start(input.into())).await? {
            AgentEvent::Complete { output, sources } => Ok(AgentRunOutput { output, sources }),
            _ => unreachable!("stop predicate only matches Complete"),
        }
    }
}

/// Scripted chat used by tests across the workspace.
pub mod scripted {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use llm_service::{ChatMessage, ChatOutcome};

    use crate::errors::{Error, LampeResult};

    enum Rule {
        Reply(ChatOutcome),
        Fail(String),
    }

    /// Replays canned outcomes and records the history it was shown.
    ///
    /// Content rules take precedence over the queue: when any message in
    /// the history contains a rule's pattern, that rule answers (without
    /// being consumed). Rules make concurrent agents deterministic.
    #[derive(Clone, Default)]
    pub struct ScriptedChat {
        outcomes: Arc<Mutex<VecDeque<ChatOutcome>>>,
        rules: Arc<Mutex<Vec<(String, Rule)>>>,
        pub seen: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
    }

    impl ScriptedChat {
        pub fn new(outcomes: Vec<ChatOutcome>) -> Self {
            Self {
                outcomes: Arc::new(Mutex::new(outcomes.into())),
                rules: Arc::new(Mutex::new(Vec::new())),
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// Answers `outcome` whenever the history contains `pattern`.
        pub fn reply_on(self, pattern: impl Into<String>, outcome: ChatOutcome) -> Self {
            self.rules.lock().unwrap().push((pattern.into(), Rule::Reply(outcome)));
            self
        }

        /// Fails the chat call whenever the history contains `pattern`.
        pub fn fail_on(self, pattern: impl Into<String>, error: impl Into<String>) -> Self {
            self.rules.lock().unwrap().push((pattern.into(), Rule::Fail(error.into())));
            self
        }

        pub fn chat(&self, messages: &[ChatMessage]) -> LampeResult<ChatOutcome> {
            self.seen.lock().unwrap().push(messages.to_vec());

            let rules = self.rules.lock().unwrap();
            for (pattern, rule) in rules.iter() {
                if messages.iter().any(|m| m.content.contains(pattern.as_str())) {
                    return match rule {
                        Rule::Reply(outcome) => Ok(outcome.clone()),
                        Rule::Fail(error) => Err(Error::Validation(error.clone())),
                    };
                }
            }
            drop(rules);

            Ok(self
                .outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| ChatOutcome::Message("scripted chat exhausted".into())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use llm_service::{Role, ToolCallRequest};

    use crate::git::runner::{GitOutput, GitRunner, ScriptedGit};
    use crate::workflow::agent::scripted::ScriptedChat;

    fn registry() -> ToolRegistry {
        let runner = ScriptedGit::new().on("ls-files -- *.rs", GitOutput::ok("a.rs\n"));
        let mut registry = ToolRegistry::with_runner(GitRunner::Scripted(runner));
        let mut partial = Map::new();
        partial.insert("repo_path".into(), json!("/repo"));
        registry.set_partial_params(partial);
        registry
    }

    #[tokio::test]
    async fn completes_without_tool_calls() {
        let chat = ScriptedChat::new(vec![ChatOutcome::Message("all done".into())]);
        let agent = FunctionCallingAgent::new(ChatClient::Scripted(chat.clone()), registry(), Some("be brief".into()));
        let out = agent.run("hello").await.unwrap();
        assert_eq!(out.output.as_deref(), Some("all done"));
        assert!(out.sources.is_empty());

        let seen = chat.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0][0].role, Role::System);
        assert_eq!(seen[0][1].content, "hello");
    }

    #[tokio::test]
    async fn dispatches_tools_and_records_sources() {
        let chat = ScriptedChat::new(vec![
            ChatOutcome::ToolCalls {
                text: String::new(),
                calls: vec![ToolCallRequest {
                    id: "call_1".into(),
                    name: "find_files_by_pattern".into(),
                    arguments: json!({"pattern": "*.rs"}),
                }],
            },
            ChatOutcome::Message("found it".into()),
        ]);
        let agent = FunctionCallingAgent::new(ChatClient::Scripted(chat.clone()), registry(), None);
        let out = agent.run("look around").await.unwrap();

        assert_eq!(out.output.as_deref(), Some("found it"));
        assert_eq!(out.sources.len(), 1);
        assert_eq!(out.sources[0].tool_name, "find_files_by_pattern");
        assert!(out.sources[0].tool_output.contains("a.rs"));

        // Second LLM turn must include the tool result message.
        let seen = chat.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        let tool_msg = seen[1].iter().find(|m| m.role == Role::Tool).unwrap();
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_1"));
        assert!(tool_msg.content.contains("a.rs"));
    }

    #[tokio::test]
    async fn unknown_tool_synthesizes_message_and_continues() {
        let chat = ScriptedChat::new(vec![
            ChatOutcome::ToolCalls {
                text: String::new(),
                calls: vec![ToolCallRequest {
                    id: "call_2".into(),
                    name: "teleport".into(),
                    arguments: json!({}),
                }],
            },
            ChatOutcome::Message("ok".into()),
        ]);
        let agent = FunctionCallingAgent::new(ChatClient::Scripted(chat.clone()), registry(), None);
        let out = agent.run("go").await.unwrap();

        assert_eq!(out.output.as_deref(), Some("ok"));
        assert!(out.sources.is_empty());
        let seen = chat.seen.lock().unwrap();
        let tool_msg = seen[1].iter().find(|m| m.role == Role::Tool).unwrap();
        assert_eq!(tool_msg.content, "Tool teleport does not exist");
    }

    #[tokio::test]
    async fn tool_error_is_reported_in_band() {
        let chat = ScriptedChat::new(vec![
            ChatOutcome::ToolCalls {
                text: String::new(),
                calls: vec![ToolCallRequest {
                    id: "call_3".into(),
                    name: "find_files_by_pattern".into(),
                    arguments: json!({"pattern": "*.rs", "bogus": 1}),
                }],
            },
            ChatOutcome::Message("recovered".into()),
        ]);
        let agent = FunctionCallingAgent::new(ChatClient::Scripted(chat.clone()), registry(), None);
        let out = agent.run("go").await.unwrap();

        assert_eq!(out.output.as_deref(), Some("recovered"));
        let seen = chat.seen.lock().unwrap();
        let tool_msg = seen[1].iter().find(|m| m.role == Role::Tool).unwrap();
        assert!(tool_msg.content.starts_with("Encountered error in tool call:"));
    }
}
