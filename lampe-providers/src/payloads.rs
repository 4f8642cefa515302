//! Typed payloads and their markdown projections.

use std::sync::OnceLock;

use regex::Regex;

use lampe_review::AgentReviewOutput;

/// A generated PR description ready for delivery.
#[derive(Debug, Clone)]
pub struct PRDescriptionPayload {
    pub description: String,
}

impl PRDescriptionPayload {
    /// The description prefixed with its stable section header.
    pub fn description_with_title(&self) -> String {
        format!("## 🔦 description\n{}", self.description)
    }
}

/// A generated PR review ready for delivery.
#[derive(Debug, Clone)]
pub struct PRReviewPayload {
    pub reviews: Vec<AgentReviewOutput>,
}

impl PRReviewPayload {
    /// Full review as markdown: agent sections, per-file subsections, line
    /// comments, and tool sources.
    pub fn review_markdown(&self) -> String {
        let mut text = String::from("## 🔍 Code Review\n\n");
        for agent_review in &self.reviews {
            text.push_str(&format!("### {}\n\n", agent_review.agent_name));
            text.push_str(&format!("**Focus Areas:** {}\n\n", agent_review.focus_areas.join(", ")));

            if !agent_review.summary.is_empty() {
                text.push_str(&format!("**Agent Summary:** {}\n\n", agent_review.summary));
            }

            for file_review in &agent_review.reviews {
                text.push_str(&format!("#### {}\n", file_review.file_path));
                text.push_str(&format!("**Summary:** {}\n\n", file_review.summary));

                if !file_review.line_comments.is_empty() {
                    text.push_str("**Line Comments:**\n");
                    for (line, comment) in &file_review.line_comments {
                        text.push_str(&format!("- Line {line}: {comment}\n"));
                    }
                    text.push('\n');
                }

                if !file_review.structured_comments.is_empty() {
                    text.push_str("**Structured Comments:**\n");
                    for comment in &file_review.structured_comments {
                        text.push_str(&format!(
                            "- Line {} ({:?}): {}\n",
                            comment.line_number, comment.severity, comment.comment
                        ));
                    }
                    text.push('\n');
                }
            }

            if !agent_review.sources.is_empty() {
                text.push_str("**Sources:**\n");
                for source in &agent_review.sources {
                    text.push_str(&format!("- **{}**: {}\n", source.tool_name, source.tool_output));
                }
                text.push('\n');
            }

            text.push_str("---\n\n");
        }
        text
    }
}

/// Parses a line-comment key into a line number.
///
/// Keys are numeric (`"12"`), legacy-prefixed (`"12:note"`), or textual
/// (`"Line 12"`); anything without digits maps to 0, which routes the
/// comment to the general (non-inline) fallback.
pub fn parse_line_number(key: &str) -> u64 {
    if let Ok(n) = key.parse() {
        return n;
    }
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    let re = DIGITS.get_or_init(|| Regex::new(r"\D*(\d+)").expect("static pattern"));
    re.captures(key)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lampe_review::FileReview;

    #[test]
    fn line_key_parsing_accepts_all_shapes() {
        assert_eq!(parse_line_number("12"), 12);
        assert_eq!(parse_line_number("12:legacy suffix"), 12);
        assert_eq!(parse_line_number("Line 34"), 34);
        assert_eq!(parse_line_number("no digits here"), 0);
        assert_eq!(parse_line_number(""), 0);
    }

    #[test]
    fn review_markdown_contains_agent_and_file_sections() {
        let payload = PRReviewPayload {
            reviews: vec![AgentReviewOutput {
                agent_name: "Bug Finder".into(),
                focus_areas: vec!["bugs".into()],
                reviews: vec![FileReview {
                    file_path: "src/a.rs".into(),
                    line_comments: [("7".to_string(), "off-by-one".to_string())].into_iter().collect(),
                    structured_comments: vec![],
                    summary: "one bug".into(),
                    agent_name: Some("Bug Finder".into()),
                }],
                sources: vec![],
                summary: "overall".into(),
            }],
        };
        let md = payload.review_markdown();
        assert!(md.contains("### Bug Finder"));
        assert!(md.contains("#### src/a.rs"));
        assert!(md.contains("- Line 7: off-by-one"));
        assert!(md.contains("**Agent Summary:** overall"));
    }

    #[test]
    fn description_title_projection() {
        let payload = PRDescriptionPayload {
            description: "Adds things.".into(),
        };
        assert_eq!(payload.description_with_title(), "## 🔦 description\nAdds things.");
    }
}
