//! Review data models and tolerant decoding of agent JSON.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::error;

use lampe_core::parsers::{FenceQuery, extract_md_code_block};
use lampe_core::tools::ToolSource;
use lampe_core::{PullRequest, Repository};

/// Review depth levels; select model tier and filtering thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDepth {
    Basic,
    #[default]
    Standard,
    Comprehensive,
}

impl ReviewDepth {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Standard => "standard",
            Self::Comprehensive => "comprehensive",
        }
    }
}

impl fmt::Display for ReviewDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewDepth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Self::Basic),
            "standard" => Ok(Self::Standard),
            "comprehensive" => Ok(Self::Comprehensive),
            other => Err(format!("unknown review depth: {other}")),
        }
    }
}

/// Issue severity. The derived order is total and sorts critical first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

/// Structured comment with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewComment {
    pub line_number: u64,
    pub comment: String,
    pub severity: Severity,
    pub category: String,
    pub agent_name: String,
}

/// Review for a specific file with inline comments.
///
/// `line_comments` keys are kept as strings: agents emit plain line numbers
/// and occasionally legacy `"12:note"` keys; the sink parses both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReview {
    pub file_path: String,
    #[serde(default)]
    pub line_comments: BTreeMap<String, String>,
    #[serde(default)]
    pub structured_comments: Vec<ReviewComment>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub agent_name: Option<String>,
}

/// Input for one specialized agent invocation.
#[derive(Debug, Clone)]
pub struct AgentReviewInput {
    pub repository: Repository,
    pub pull_request: PullRequest,
    /// Formatted changed-file listing with stats.
    pub files_changed: String,
    pub review_depth: ReviewDepth,
    pub custom_guidelines: Option<Vec<String>>,
    /// The single file a diff-focused agent is assigned to.
    pub target_file_path: Option<String>,
}

/// Output from one specialized agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReviewOutput {
    pub agent_name: String,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    #[serde(default)]
    pub reviews: Vec<FileReview>,
    #[serde(default)]
    pub sources: Vec<ToolSource>,
    #[serde(default)]
    pub summary: String,
}

/// Input for the review pipelines.
#[derive(Debug, Clone)]
pub struct PRReviewInput {
    pub repository: Repository,
    pub pull_request: PullRequest,
    pub review_depth: ReviewDepth,
    pub custom_guidelines: Option<Vec<String>>,
    pub files_exclude_patterns: Vec<String>,
    pub files_reinclude_patterns: Vec<String>,
}

/// Final pipeline output.
#[derive(Debug, Clone, Serialize)]
pub struct PRReviewOutput {
    pub reviews: Vec<AgentReviewOutput>,
}

/* ===========================================================================
Agent response decoding
======================================================================== */

#[derive(Debug, Deserialize)]
struct AgentResponseModel {
    reviews: Vec<serde_json::Value>,
    #[serde(default)]
    summary: Option<String>,
}

/// Unwraps a fenced reply (any language tag) before JSON decoding.
pub(crate) fn strip_any_fence(content: &str) -> String {
    extract_md_code_block(content, FenceQuery::AnyLanguage).unwrap_or_else(|| content.trim().to_string())
}

fn decode_response(content: &str) -> Option<AgentResponseModel> {
    serde_json::from_str(strip_any_fence(content).trim()).ok()
}

/// Parses an agent's final text into file reviews.
///
/// Tolerates fenced JSON and partial review items. On any decode failure,
/// falls back to a single catch-all review carrying the raw text.
pub fn parse_agent_response(content: &str, agent_name: &str) -> Vec<FileReview> {
    let Some(model) = decode_response(content) else {
        return vec![FileReview {
            file_path: "general".to_string(),
            line_comments: BTreeMap::new(),
            structured_comments: Vec::new(),
            summary: content.to_string(),
            agent_name: Some(agent_name.to_string()),
        }];
    };

    model
        .reviews
        .into_iter()
        .map(|item| {
            let file_path = item
                .get("file_path")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string();
            let line_comments = item
                .get("line_comments")
                .and_then(|v| v.as_object())
                .map(|obj| {
                    obj.iter()
                        .map(|(k, v)| {
                            let text = v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string());
                            (k.clone(), text)
                        })
                        .collect()
                })
                .unwrap_or_default();
            let summary = item
                .get("summary")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            FileReview {
                file_path,
                line_comments,
                structured_comments: Vec::new(),
                summary,
                agent_name: Some(agent_name.to_string()),
            }
        })
        .collect()
}

/// Pulls the overall summary out of an agent's final text.
pub fn extract_summary(content: &str, agent_name: &str) -> String {
    match decode_response(content).and_then(|m| m.summary) {
        Some(summary) => summary,
        None => {
            error!(agent = agent_name, "error extracting summary from agent response");
            format!("Review completed by {agent_name}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_sorts_critical_first() {
        let mut severities = vec![Severity::Low, Severity::Critical, Severity::Medium, Severity::High];
        severities.sort();
        assert_eq!(
            severities,
            vec![Severity::Critical, Severity::High, Severity::Medium, Severity::Low]
        );
    }

    #[test]
    fn severity_serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"critical\"");
        let back: Severity = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(back, Severity::High);
        assert!(serde_json::from_str::<Severity>("\"urgent\"").is_err());
    }

    #[test]
    fn review_depth_parses_from_cli_strings() {
        assert_eq!("comprehensive".parse::<ReviewDepth>().unwrap(), ReviewDepth::Comprehensive);
        assert!("extreme".parse::<ReviewDepth>().is_err());
        assert_eq!(ReviewDepth::Basic.to_string(), "basic");
    }

    #[test]
    fn parses_well_formed_response() {
        let content = r#"{"reviews": [{"file_path": "src/a.rs", "line_comments": {"12": "off-by-one"}, "summary": "one bug"}], "summary": "overall"}"#;
        let reviews = parse_agent_response(content, "Bug Finder");
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].file_path, "src/a.rs");
        assert_eq!(reviews[0].line_comments.get("12").unwrap(), "off-by-one");
        assert_eq!(reviews[0].agent_name.as_deref(), Some("Bug Finder"));
        assert_eq!(extract_summary(content, "Bug Finder"), "overall");
    }

    #[test]
    fn parses_fenced_json() {
        let content = "```json\n{\"reviews\": [], \"summary\": \"clean\"}\n```";
        assert!(parse_agent_response(content, "a").is_empty());
        assert_eq!(extract_summary(content, "a"), "clean");
    }

    #[test]
    fn unparsable_response_becomes_catch_all_review() {
        let content = "I could not produce JSON, sorry.";
        let reviews = parse_agent_response(content, "Bug Finder");
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].file_path, "general");
        assert_eq!(reviews[0].summary, content);
        assert_eq!(extract_summary(content, "Bug Finder"), "Review completed by Bug Finder");
    }

    #[test]
    fn missing_fields_get_defaults() {
        let content = r#"{"reviews": [{}]}"#;
        let reviews = parse_agent_response(content, "a");
        assert_eq!(reviews[0].file_path, "unknown");
        assert!(reviews[0].line_comments.is_empty());
        assert_eq!(reviews[0].summary, "");
    }

    #[test]
    fn non_string_comment_values_are_stringified() {
        let content = r#"{"reviews": [{"file_path": "f", "line_comments": {"3": {"text": "odd"}}}]}"#;
        let reviews = parse_agent_response(content, "a");
        assert!(reviews[0].line_comments.get("3").unwrap().contains("odd"));
    }

    #[test]
    fn agent_review_output_round_trips() {
        let output = AgentReviewOutput {
            agent_name: "n".into(),
            focus_areas: vec!["bugs".into()],
            reviews: vec![],
            sources: vec![],
            summary: "s".into(),
        };
        let json = serde_json::to_string(&output).unwrap();
        let back: AgentReviewOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(back.agent_name, "n");
    }
}
