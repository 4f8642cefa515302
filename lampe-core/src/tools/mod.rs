//! LLM-invocable repository tools.
//!
//! The tool set is a closed enum with no runtime reflection. Each tool carries
//! a JSON schema for the model and an allow-list of argument names; the
//! registry merges orchestrator-bound partial params (`repo_path`,
//! `include_line_numbers`) over model-supplied arguments and rejects
//! anything outside the schema. The model is never permitted to supply
//! `repo_path` itself.

pub mod descriptions;

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::errors::{Error, ToolError};
use crate::git::diff::DEFAULT_DIFF_BATCH_SIZE;
use crate::git::runner::{GitInspector, GitRunner};

/// Result of one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub content: String,
}

/// Trace entry recorded per successful tool call.
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct ToolSource {
    pub tool_name: String,
    pub tool_kwargs: Value,
    pub tool_output: String,
}

/// The closed set of repository tools exposed to agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitToolKind {
    GetDiffForFiles,
    GetFileContentAtCommit,
    FindFilesByPattern,
    SearchInFiles,
}

impl GitToolKind {
    pub const ALL: [Self; 4] = [
        Self::GetDiffForFiles,
        Self::GetFileContentAtCommit,
        Self::FindFilesByPattern,
        Self::SearchInFiles,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::GetDiffForFiles => "get_diff_for_files",
            Self::GetFileContentAtCommit => "get_file_content_at_commit",
            Self::FindFilesByPattern => "find_files_by_pattern",
            Self::SearchInFiles => "search_in_files",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::GetDiffForFiles => descriptions::GET_DIFF_FOR_FILES_DESCRIPTION,
            Self::GetFileContentAtCommit => descriptions::GET_FILE_CONTENT_AT_COMMIT_DESCRIPTION,
            Self::FindFilesByPattern => descriptions::FIND_FILES_BY_PATTERN_DESCRIPTION,
            Self::SearchInFiles => descriptions::SEARCH_IN_FILES_DESCRIPTION,
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Argument names this tool accepts, model-supplied or partial.
    fn accepted_params(self) -> &'static [&'static str] {
        match self {
            Self::GetDiffForFiles => &["base_reference", "head_reference", "file_paths", "repo_path"],
            Self::GetFileContentAtCommit => &[
                "commit_reference",
                "file_path",
                "line_start",
                "line_end",
                "include_line_numbers",
                "repo_path",
            ],
            Self::FindFilesByPattern => &["pattern", "repo_path"],
            Self::SearchInFiles => &[
                "pattern",
                "relative_dir_path",
                "commit_reference",
                "include_line_numbers",
                "repo_path",
            ],
        }
    }

    /// JSON schema for the model-visible arguments (never `repo_path`).
    pub fn parameters_schema(self) -> Value {
        match self {
            Self::GetDiffForFiles => json!({
                "type": "object",
                "properties": {
                    "base_reference": {"type": "string", "description": "Base commit to compare from"},
                    "head_reference": {"type": "string", "description": "Head commit to compare to (defaults to HEAD)"},
                    "file_paths": {"type": "array", "items": {"type": "string"}, "description": "Specific files to diff"}
                },
                "required": ["base_reference"]
            }),
            Self::GetFileContentAtCommit => json!({
                "type": "object",
                "properties": {
                    "commit_reference": {"type": "string", "description": "Commit reference"},
                    "file_path": {"type": "string", "description": "Path relative to the repository root"},
                    "line_start": {"type": "integer", "description": "First line (0-based, inclusive)"},
                    "line_end": {"type": "integer", "description": "Last line (0-based, inclusive)"}
                },
                "required": ["commit_reference", "file_path"]
            }),
            Self::FindFilesByPattern => json!({
                "type": "object",
                "properties": {
                    "pattern": {"type": "string", "description": "Pathspec pattern, e.g. '*.py'"}
                },
                "required": ["pattern"]
            }),
            Self::SearchInFiles => json!({
                "type": "object",
                "properties": {
                    "pattern": {"type": "string", "description": "POSIX extended regex"},
                    "relative_dir_path": {"type": "string", "description": "Directory to search in (empty for whole tree)"},
                    "commit_reference": {"type": "string", "description": "Commit reference to search at"}
                },
                "required": ["pattern", "relative_dir_path", "commit_reference"]
            }),
        }
    }
}

/// Registry binding the tool set to a repository via partial params.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<GitToolKind>,
    partial_params: Map<String, Value>,
    runner: GitRunner,
}

impl ToolRegistry {
    /// Registry with the full git tool set and no bindings yet.
    pub fn with_git_tools() -> Self {
        Self {
            tools: GitToolKind::ALL.to_vec(),
            partial_params: Map::new(),
            runner: GitRunner::default(),
        }
    }

    /// Registry over an injected runner (used by tests).
    pub fn with_runner(runner: GitRunner) -> Self {
        Self {
            tools: GitToolKind::ALL.to_vec(),
            partial_params: Map::new(),
            runner,
        }
    }

    /// Installs orchestrator-bound arguments; merged over model arguments
    /// at dispatch time. Bound once per agent invocation.
    pub fn set_partial_params(&mut self, params: Map<String, Value>) {
        self.partial_params = params;
    }

    pub fn partial_params(&self) -> &Map<String, Value> {
        &self.partial_params
    }

    /// Wire definitions for the LLM adapter.
    pub fn definitions(&self) -> Vec<llm_service::ToolDefinition> {
        self.tools
            .iter()
            .map(|t| llm_service::ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect()
    }

    /// Invokes a tool by name with model-supplied arguments.
    ///
    /// # Errors
    /// - [`ToolError::UnknownTool`] for names outside the registry
    /// - [`ToolError::InvalidArguments`] for schema violations (including a
    ///   model-supplied `repo_path`)
    pub async fn dispatch(&self, name: &str, args: &Value) -> Result<ToolOutput, Error> {
        let tool = GitToolKind::from_name(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        if !self.tools.contains(&tool) {
            return Err(ToolError::UnknownTool(name.to_string()).into());
        }

        let model_args = args.as_object().cloned().unwrap_or_default();
        if model_args.contains_key("repo_path") {
            return Err(ToolError::InvalidArguments {
                tool: name.to_string(),
                reason: "repo_path is bound by the orchestrator and cannot be supplied".into(),
            }
            .into());
        }
        let accepted = tool.accepted_params();
        for key in model_args.keys() {
            if !accepted.contains(&key.as_str()) {
                return Err(ToolError::InvalidArguments {
                    tool: name.to_string(),
                    reason: format!("unexpected argument: {key}"),
                }
                .into());
            }
        }

        // Partial params win over model arguments; ones the tool does not
        // accept are dropped.
        let mut merged = model_args;
        for (key, value) in &self.partial_params {
            if accepted.contains(&key.as_str()) {
                merged.insert(key.clone(), value.clone());
            }
        }

        let repo_path = merged
            .get("repo_path")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments {
                tool: name.to_string(),
                reason: "repo_path partial param is not bound".into(),
            })?
            .to_string();
        let inspector = GitInspector::with_runner(repo_path, self.runner.clone());

        debug!(tool = name, "dispatching tool call");
        let content = self.invoke(tool, &inspector, &merged).await?;
        Ok(ToolOutput { content })
    }

    async fn invoke(
        &self,
        tool: GitToolKind,
        inspector: &GitInspector,
        args: &Map<String, Value>,
    ) -> Result<String, Error> {
        let str_arg = |key: &str| -> Result<String, Error> {
            args.get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    ToolError::InvalidArguments {
                        tool: tool.name().to_string(),
                        reason: format!("missing required argument: {key}"),
                    }
                    .into()
                })
        };
        let flag_arg = |key: &str| args.get(key).and_then(Value::as_bool).unwrap_or(false);

        match tool {
            GitToolKind::GetDiffForFiles => {
                let base = str_arg("base_reference")?;
                let head = args
                    .get("head_reference")
                    .and_then(Value::as_str)
                    .unwrap_or("HEAD")
                    .to_string();
                let paths: Vec<String> = args
                    .get("file_paths")
                    .and_then(Value::as_array)
                    .map(|a| {
                        a.iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(inspector
                    .get_diff_for_files(&base, &head, &paths, DEFAULT_DIFF_BATCH_SIZE)
                    .await?)
            }
            GitToolKind::GetFileContentAtCommit => {
                let commit = str_arg("commit_reference")?;
                let file_path = str_arg("file_path")?;
                let line_start = args.get("line_start").and_then(Value::as_u64);
                let line_end = args.get("line_end").and_then(Value::as_u64);
                let range = match (line_start, line_end) {
                    (Some(s), Some(e)) => Some((s as usize, e as usize)),
                    _ => None,
                };
                Ok(inspector
                    .get_file_content_at_commit(&commit, &file_path, range, flag_arg("include_line_numbers"))
                    .await?)
            }
            GitToolKind::FindFilesByPattern => {
                let pattern = str_arg("pattern")?;
                Ok(inspector.find_files_by_pattern(&pattern).await?)
            }
            GitToolKind::SearchInFiles => {
                let pattern = str_arg("pattern")?;
                let dir = args
                    .get("relative_dir_path")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
                let commit = str_arg("commit_reference")?;
                Ok(inspector
                    .search_in_files(&pattern, &dir, &commit, flag_arg("include_line_numbers"))
                    .await?)
            }
        }
    }
}
