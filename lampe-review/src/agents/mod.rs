//! Specialized review agents.
//!
//! Every agent is the function-calling loop with a fixed system prompt and
//! focus-area metadata. The diff-focused agent reviews one assigned file;
//! the rest review the whole PR and differ only in prompt and focus areas.

pub mod prompts;

use std::time::Duration;

use serde_json::{Map, json};
use tracing::debug;

use lampe_core::errors::{Error, LampeResult};
use lampe_core::git::diff::DEFAULT_DIFF_BATCH_SIZE;
use lampe_core::git::{GitInspector, GitRunner};
use lampe_core::tools::ToolRegistry;
use lampe_core::workflow::agent::{ChatClient, FunctionCallingAgent};

use crate::data_models::{AgentReviewInput, AgentReviewOutput, extract_summary, parse_agent_response};

/// Static description of one agent flavor.
#[derive(Debug, Clone, Copy)]
pub struct AgentSpec {
    pub name: &'static str,
    pub focus_areas: &'static [&'static str],
    pub system_prompt: &'static str,
}

/// The per-file bug finder used by the diff-by-diff pipeline.
pub const DIFF_FOCUSED: AgentSpec = AgentSpec {
    name: "Diff-Focused Bug Finder",
    focus_areas: &[
        "Bug detection",
        "Regression identification",
        "Integration issues",
        "Logic errors",
        "Runtime errors",
    ],
    system_prompt: prompts::DIFF_FOCUSED_SYSTEM_PROMPT,
};

pub const SECURITY: AgentSpec = AgentSpec {
    name: "Security Reviewer",
    focus_areas: &["Injection risks", "Secrets handling", "Authentication", "Input validation"],
    system_prompt: prompts::SECURITY_SYSTEM_PROMPT,
};

pub const PERFORMANCE: AgentSpec = AgentSpec {
    name: "Performance Reviewer",
    focus_areas: &["Algorithmic complexity", "Memory growth", "Hot paths", "Batching"],
    system_prompt: prompts::PERFORMANCE_SYSTEM_PROMPT,
};

pub const TESTING: AgentSpec = AgentSpec {
    name: "Testing Reviewer",
    focus_areas: &["Test coverage", "Edge cases", "Assertion quality"],
    system_prompt: prompts::TESTING_SYSTEM_PROMPT,
};

pub const API_USAGE: AgentSpec = AgentSpec {
    name: "API Usage Reviewer",
    focus_areas: &["API contracts", "Error handling", "Resource cleanup", "Deprecations"],
    system_prompt: prompts::API_USAGE_SYSTEM_PROMPT,
};

pub const DESIGN_PATTERN: AgentSpec = AgentSpec {
    name: "Design Pattern Reviewer",
    focus_areas: &["Architecture fit", "Layering", "Abstraction boundaries", "Invariants"],
    system_prompt: prompts::DESIGN_PATTERN_SYSTEM_PROMPT,
};

pub const CODE_QUALITY: AgentSpec = AgentSpec {
    name: "Code Quality Reviewer",
    focus_areas: &["Dead code", "Naming", "Error paths", "Comment drift"],
    system_prompt: prompts::CODE_QUALITY_SYSTEM_PROMPT,
};

pub const DEFAULT: AgentSpec = AgentSpec {
    name: "General Reviewer",
    focus_areas: &["Bug detection", "Regressions", "Risky changes"],
    system_prompt: prompts::DEFAULT_SYSTEM_PROMPT,
};

/// One runnable review agent.
pub struct SpecializedReviewAgent {
    spec: AgentSpec,
    chat: ChatClient,
    runner: GitRunner,
    timeout: Option<Duration>,
}

impl SpecializedReviewAgent {
    pub fn new(spec: AgentSpec, chat: ChatClient) -> Self {
        Self {
            spec,
            chat,
            runner: GitRunner::default(),
            timeout: None,
        }
    }

    pub fn with_runner(mut self, runner: GitRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    /// Reviews the single file assigned in `input.target_file_path`.
    ///
    /// Prep: compute the file's diff up front (with a placeholder when it is
    /// empty), render the user prompt, bind the repo path and line numbers
    /// as tool partial params, run the loop, and parse the final text.
    pub async fn review_diff(&self, input: &AgentReviewInput) -> LampeResult<AgentReviewOutput> {
        let target = input
            .target_file_path
            .as_deref()
            .ok_or_else(|| Error::Validation("diff-focused agent requires target_file_path".into()))?;

        let inspector = GitInspector::with_runner(&input.repository.local_path, self.runner.clone());
        let mut target_file_diff = inspector
            .get_diff_for_files(
                &input.pull_request.base_commit_hash,
                &input.pull_request.head_commit_hash,
                &[target.to_string()],
                DEFAULT_DIFF_BATCH_SIZE,
            )
            .await?;
        if target_file_diff.trim().is_empty() {
            target_file_diff = format!("(No diff content found for {target} - file may be newly added or deleted)");
        }

        let query = prompts::DIFF_FOCUSED_USER_PROMPT
            .replace("{pull_request_number}", &input.pull_request.number.to_string())
            .replace("{pull_request_title}", &input.pull_request.title)
            .replace("{base_commit_hash}", &input.pull_request.base_commit_hash)
            .replace("{head_commit_hash}", &input.pull_request.head_commit_hash)
            .replace("{target_file_path}", target)
            .replace("{target_file_diff}", &target_file_diff)
            .replace("{files_changed}", &input.files_changed)
            .replace("{review_depth}", input.review_depth.as_str())
            .replace(
                "{review_depth_guidelines}",
                prompts::review_depth_guidelines(input.review_depth),
            )
            .replace(
                "{custom_guidelines_section}",
                &prompts::custom_guidelines_section(input.custom_guidelines.as_deref()),
            );

        debug!(agent = self.spec.name, target, "running diff-focused review");
        self.run_agent(input, query).await
    }

    /// Reviews the whole PR (no assigned file).
    pub async fn review(&self, input: &AgentReviewInput) -> LampeResult<AgentReviewOutput> {
        let query = prompts::AGENT_PROMPT_TEMPLATE
            .replace("{agent_name}", self.spec.name)
            .replace("{pull_request_number}", &input.pull_request.number.to_string())
            .replace("{pull_request_title}", &input.pull_request.title)
            .replace("{focus_areas}", &self.spec.focus_areas.join(", "))
            .replace("{files_changed}", &input.files_changed)
            .replace("{review_depth}", input.review_depth.as_str())
            .replace(
                "{review_depth_guidelines}",
                prompts::review_depth_guidelines(input.review_depth),
            );

        debug!(agent = self.spec.name, "running whole-PR review");
        self.run_agent(input, query).await
    }

    async fn run_agent(&self, input: &AgentReviewInput, query: String) -> LampeResult<AgentReviewOutput> {
        let registry = ToolRegistry::with_runner(self.runner.clone());
        let mut agent = FunctionCallingAgent::new(
            self.chat.clone(),
            registry,
            Some(self.spec.system_prompt.to_string()),
        )
        .with_timeout(self.timeout);

        // Bind the clone and enable line numbers for every tool call.
        let mut partial = Map::new();
        partial.insert("repo_path".into(), json!(input.repository.local_path));
        partial.insert("include_line_numbers".into(), json!(true));
        agent.update_tools(partial);

        let run = agent.run(query).await?;
        let output_text = run.output.unwrap_or_default();

        Ok(AgentReviewOutput {
            agent_name: self.spec.name.to_string(),
            focus_areas: self.spec.focus_areas.iter().map(|s| s.to_string()).collect(),
            reviews: parse_agent_response(&output_text, self.spec.name),
            sources: run.sources,
            summary: extract_summary(&output_text, self.spec.name),
        })
    }
}
