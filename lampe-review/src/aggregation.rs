//! LLM-based cleanup of parallel review output.
//!
//! A single chat call receives the files-changed summary plus the
//! JSON-serialized agent outputs and returns the same structure with
//! duplicates, hallucinations, noise, and non-actionable comments removed.
//! If the reply does not parse, the pre-aggregation reviews are returned
//! unchanged.

use serde::Deserialize;
use tracing::{debug, error};

use lampe_core::errors::LampeResult;
use lampe_core::workflow::agent::ChatClient;
use llm_service::ChatMessage;

use crate::data_models::{AgentReviewOutput, strip_any_fence};

pub const AGGREGATION_SYSTEM_PROMPT: &str = r#"# Role and Objective
You are an expert code review aggregator. You receive reviews from multiple agents that reviewed different files in parallel. Clean them up:
1. Remove duplicate comments: same issue, same file, same or nearby line (within 2 lines). Keep the most detailed one; merge complementary comments into one.
2. Remove hallucinations: comments referencing lines outside the diff, or functions, classes, and variables that do not exist in the reviewed files.
3. Remove non-actionable comments: vague feedback ("consider refactoring"), generic praise, comments that do not say what is wrong or how to fix it.
4. Remove noise: style preferences, minor formatting, personal naming taste, anything that will not cause bugs or materially affect quality.

Keep specific bug reports with line numbers, security issues, logic errors, missing error handling for critical operations, performance problems, and integration issues.

# Output Format
Return JSON with the exact same structure as the input:
{"agent_outputs": [ ...cleaned AgentReviewOutput objects... ]}
Do not invent comments that were not present in the input."#;

pub const AGGREGATION_USER_PROMPT: &str = r#"Files changed in this PR:
{files_changed}

Agent reviews to clean and deduplicate:
{agent_reviews_json}"#;

#[derive(Debug, Deserialize)]
struct AggregatedReviewsModel {
    agent_outputs: Vec<serde_json::Value>,
}

/// Runs the aggregation pass.
///
/// Invalid entries in the model's reply are dropped individually; a reply
/// that does not parse at all downgrades to the original reviews.
pub async fn aggregate_reviews(
    chat: &ChatClient,
    agent_reviews: Vec<AgentReviewOutput>,
    files_changed: &str,
) -> LampeResult<Vec<AgentReviewOutput>> {
    if agent_reviews.is_empty() {
        debug!("no agent reviews to aggregate");
        return Ok(agent_reviews);
    }
    debug!(count = agent_reviews.len(), "aggregating agent reviews");

    let agent_reviews_json =
        serde_json::to_string_pretty(&agent_reviews).unwrap_or_else(|_| "[]".to_string());
    let user_prompt = AGGREGATION_USER_PROMPT
        .replace("{files_changed}", files_changed)
        .replace("{agent_reviews_json}", &agent_reviews_json);

    let messages = vec![
        ChatMessage::system(AGGREGATION_SYSTEM_PROMPT),
        ChatMessage::user(user_prompt),
    ];
    let outcome = chat.chat(&messages, &[]).await?;
    let reply = match outcome {
        llm_service::ChatOutcome::Message(text) => text,
        llm_service::ChatOutcome::ToolCalls { text, .. } => text,
    };

    let cleaned = strip_any_fence(&reply);
    match serde_json::from_str::<AggregatedReviewsModel>(cleaned.trim()) {
        Ok(model) => {
            let mut aggregated = Vec::with_capacity(model.agent_outputs.len());
            for entry in model.agent_outputs {
                match serde_json::from_value::<AgentReviewOutput>(entry) {
                    Ok(output) => aggregated.push(output),
                    Err(e) => {
                        error!(error = %e, "failed to parse aggregated agent output, dropping entry");
                    }
                }
            }
            debug!(count = aggregated.len(), "aggregation complete");
            Ok(aggregated)
        }
        Err(e) => {
            error!(error = %e, "failed to parse aggregation response, falling back to original reviews");
            Ok(agent_reviews)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lampe_core::workflow::agent::scripted::ScriptedChat;
    use llm_service::ChatOutcome;

    fn review(name: &str) -> AgentReviewOutput {
        AgentReviewOutput {
            agent_name: name.to_string(),
            focus_areas: vec!["bugs".into()],
            reviews: vec![],
            sources: vec![],
            summary: format!("summary from {name}"),
        }
    }

    #[tokio::test]
    async fn empty_input_skips_the_llm() {
        let chat = ChatClient::Scripted(ScriptedChat::new(vec![]));
        let out = aggregate_reviews(&chat, vec![], "").await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn valid_reply_replaces_reviews() {
        let reply = r#"{"agent_outputs": [{"agent_name": "kept", "summary": "deduped"}]}"#;
        let chat = ChatClient::Scripted(ScriptedChat::new(vec![ChatOutcome::Message(reply.into())]));
        let out = aggregate_reviews(&chat, vec![review("a"), review("b")], "files")
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].agent_name, "kept");
    }

    #[tokio::test]
    async fn invalid_entries_are_dropped_individually() {
        let reply = r#"{"agent_outputs": [{"agent_name": "ok"}, {"no_name": true}, 42]}"#;
        let chat = ChatClient::Scripted(ScriptedChat::new(vec![ChatOutcome::Message(reply.into())]));
        let out = aggregate_reviews(&chat, vec![review("a")], "files").await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].agent_name, "ok");
    }

    #[tokio::test]
    async fn unparsable_reply_falls_back_to_input() {
        let chat = ChatClient::Scripted(ScriptedChat::new(vec![ChatOutcome::Message("not json at all".into())]));
        let originals = vec![review("a"), review("b")];
        let out = aggregate_reviews(&chat, originals.clone(), "files").await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].agent_name, "a");
    }

    #[tokio::test]
    async fn fenced_reply_is_unwrapped() {
        let reply = "```json\n{\"agent_outputs\": [{\"agent_name\": \"fenced\"}]}\n```";
        let chat = ChatClient::Scripted(ScriptedChat::new(vec![ChatOutcome::Message(reply.into())]));
        let out = aggregate_reviews(&chat, vec![review("a")], "files").await.unwrap();
        assert_eq!(out[0].agent_name, "fenced");
    }
}
