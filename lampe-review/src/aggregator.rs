//! Heuristic merge of multi-agent findings.
//!
//! Used by the sequential multi-agent pipeline: groups reviews by file,
//! merges line comments with agent attribution, deduplicates structured
//! comments by (line, category), and keeps the highest severity among
//! merged duplicates.

use std::collections::BTreeMap;

use crate::data_models::{AgentReviewOutput, FileReview, ReviewComment};

/// Merges per-agent outputs into one review per file.
pub fn aggregate_agent_reviews(agent_reviews: &[AgentReviewOutput]) -> Vec<FileReview> {
    let mut by_file: BTreeMap<String, Vec<&FileReview>> = BTreeMap::new();
    for agent_output in agent_reviews {
        for review in &agent_output.reviews {
            by_file.entry(review.file_path.clone()).or_default().push(review);
        }
    }

    by_file
        .into_iter()
        .map(|(file_path, reviews)| merge_file_reviews(file_path, &reviews))
        .collect()
}

fn merge_file_reviews(file_path: String, reviews: &[&FileReview]) -> FileReview {
    let mut line_comments: BTreeMap<String, String> = BTreeMap::new();
    let mut structured = Vec::new();
    let mut summaries = Vec::new();
    let mut agent_names = Vec::new();

    for review in reviews {
        let attribution = review.agent_name.as_deref().unwrap_or("unknown");
        for (line, comment) in &review.line_comments {
            line_comments
                .entry(line.clone())
                .and_modify(|existing| {
                    existing.push_str(&format!(" [{attribution}]: {comment}"));
                })
                .or_insert_with(|| format!("[{attribution}]: {comment}"));
        }
        structured.extend(review.structured_comments.iter().cloned());
        if !review.summary.is_empty() {
            summaries.push(format!("[{attribution}]: {}", review.summary));
        }
        if let Some(name) = &review.agent_name {
            if !agent_names.contains(name) {
                agent_names.push(name.clone());
            }
        }
    }

    FileReview {
        file_path,
        line_comments,
        structured_comments: deduplicate_comments(structured),
        summary: combined_summary(&summaries, &agent_names),
        agent_name: if agent_names.is_empty() {
            None
        } else {
            Some(agent_names.join(", "))
        },
    }
}

/// Groups by (line, category), merges each group into one comment carrying
/// the highest severity, then sorts by severity and line.
fn deduplicate_comments(comments: Vec<ReviewComment>) -> Vec<ReviewComment> {
    let mut grouped: BTreeMap<(u64, String), Vec<ReviewComment>> = BTreeMap::new();
    for comment in comments {
        grouped
            .entry((comment.line_number, comment.category.clone()))
            .or_default()
            .push(comment);
    }

    let mut deduplicated: Vec<ReviewComment> = grouped
        .into_values()
        .map(|mut group| {
            if group.len() == 1 {
                group.remove(0)
            } else {
                let severity = group.iter().map(|c| c.severity).min().expect("group non-empty");
                let merged_text = group
                    .iter()
                    .map(|c| format!("[{}]: {}", c.agent_name, c.comment))
                    .collect::<Vec<_>>()
                    .join(" | ");
                let mut agents: Vec<&str> = group.iter().map(|c| c.agent_name.as_str()).collect();
                agents.dedup();
                ReviewComment {
                    line_number: group[0].line_number,
                    comment: merged_text,
                    severity,
                    category: group[0].category.clone(),
                    agent_name: agents.join(", "),
                }
            }
        })
        .collect();

    deduplicated.sort_by(|a, b| a.severity.cmp(&b.severity).then(a.line_number.cmp(&b.line_number)));
    deduplicated
}

fn combined_summary(summaries: &[String], agent_names: &[String]) -> String {
    match summaries {
        [] => "Multi-agent review completed".to_string(),
        [only] => only.clone(),
        many => {
            let mut parts = vec![
                format!("Multi-agent review completed by {}:", agent_names.join(", ")),
                String::new(),
            ];
            for (i, summary) in many.iter().enumerate() {
                parts.push(format!("{}. {summary}", i + 1));
            }
            parts.join("\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_models::Severity;

    fn comment(line: u64, category: &str, severity: Severity, agent: &str) -> ReviewComment {
        ReviewComment {
            line_number: line,
            comment: format!("issue at {line}"),
            severity,
            category: category.to_string(),
            agent_name: agent.to_string(),
        }
    }

    fn file_review(agent: &str, path: &str, line: &str, text: &str) -> FileReview {
        FileReview {
            file_path: path.to_string(),
            line_comments: [(line.to_string(), text.to_string())].into_iter().collect(),
            structured_comments: vec![],
            summary: format!("{agent} summary"),
            agent_name: Some(agent.to_string()),
        }
    }

    fn output(agent: &str, reviews: Vec<FileReview>) -> AgentReviewOutput {
        AgentReviewOutput {
            agent_name: agent.to_string(),
            focus_areas: vec![],
            reviews,
            sources: vec![],
            summary: String::new(),
        }
    }

    #[test]
    fn merges_line_comments_with_attribution() {
        let reviews = vec![
            output("sec", vec![file_review("sec", "a.rs", "5", "leaks key")]),
            output("perf", vec![file_review("perf", "a.rs", "5", "slow loop")]),
        ];
        let merged = aggregate_agent_reviews(&reviews);
        assert_eq!(merged.len(), 1);
        let combined = merged[0].line_comments.get("5").unwrap();
        assert!(combined.contains("[sec]: leaks key"));
        assert!(combined.contains("[perf]: slow loop"));
        assert_eq!(merged[0].agent_name.as_deref(), Some("sec, perf"));
    }

    #[test]
    fn dedup_keeps_highest_severity() {
        let merged = deduplicate_comments(vec![
            comment(10, "security", Severity::Medium, "a"),
            comment(10, "security", Severity::Critical, "b"),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].severity, Severity::Critical);
        assert!(merged[0].comment.contains("[a]:"));
        assert!(merged[0].comment.contains("[b]:"));
    }

    #[test]
    fn dedup_sorts_by_severity_then_line() {
        let merged = deduplicate_comments(vec![
            comment(30, "quality", Severity::Low, "a"),
            comment(20, "security", Severity::Critical, "a"),
            comment(10, "perf", Severity::Medium, "a"),
        ]);
        let order: Vec<(Severity, u64)> = merged.iter().map(|c| (c.severity, c.line_number)).collect();
        assert_eq!(
            order,
            vec![(Severity::Critical, 20), (Severity::Medium, 10), (Severity::Low, 30)]
        );
    }

    #[test]
    fn empty_summaries_get_a_placeholder() {
        assert_eq!(combined_summary(&[], &[]), "Multi-agent review completed");
    }
}
