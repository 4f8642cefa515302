//! Markdown fenced-block extraction.
//!
//! LLM replies often wrap the actual answer in a fenced block (```md, or a
//! bare ```). [`remove_markdown_code_block`] unwraps those while leaving
//! fenced blocks with other language tags intact.
//!
//! Fence rules: an opening fence is an unindented ```<lang> line; the block
//! closes at the first unindented bare ``` line. Indented fences inside the
//! block are nested content and pass through verbatim.

/// Which opening fences qualify for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceQuery<'a> {
    /// Fence language must equal this tag (case-insensitive); `""` means a
    /// bare ``` fence.
    Language(&'a str),
    /// Any fence, tagged or bare.
    AnyLanguage,
}

fn fence_language(line: &str) -> Option<&str> {
    // Opening fences are unindented; indented ones are nested content.
    if line.starts_with(' ') || line.starts_with('\t') {
        return None;
    }
    let rest = line.strip_prefix("```")?;
    let tag = rest.trim_end();
    if tag.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        Some(tag)
    } else {
        None
    }
}

fn is_closing_fence(line: &str) -> bool {
    !line.starts_with(' ') && !line.starts_with('\t') && line.trim_end() == "```"
}

/// Extracts the content of the first fenced block matching `query`.
///
/// Returns `None` when no complete (opened and closed) matching block
/// exists.
pub fn extract_md_code_block(output: &str, query: FenceQuery<'_>) -> Option<String> {
    let lines: Vec<&str> = output.lines().collect();
    let mut idx = 0;
    while idx < lines.len() {
        if let Some(tag) = fence_language(lines[idx]) {
            let matches = match query {
                FenceQuery::Language(want) => tag.eq_ignore_ascii_case(want),
                FenceQuery::AnyLanguage => true,
            };
            if matches {
                let body_start = idx + 1;
                let mut end = body_start;
                while end < lines.len() && !is_closing_fence(lines[end]) {
                    end += 1;
                }
                if end < lines.len() {
                    return Some(lines[body_start..end].join("\n"));
                }
                // Unclosed block: keep scanning from the line after the
                // opener in case a later block is complete.
            }
        }
        idx += 1;
    }
    None
}

/// Unwraps a markdown-tagged or bare fenced block from LLM output.
///
/// Order: ```md, then ```markdown, then a bare ```; otherwise the trimmed
/// original. When the chosen content still contains a complete fenced block
/// of its own (another language), it is returned unchanged so that block
/// survives. Dangling backtick runs at the edges are stripped last.
pub fn remove_markdown_code_block(output: &str) -> String {
    if output.is_empty() {
        return String::new();
    }

    let mut content = extract_md_code_block(output, FenceQuery::Language("md"))
        .or_else(|| extract_md_code_block(output, FenceQuery::Language("markdown")))
        .or_else(|| extract_md_code_block(output, FenceQuery::Language("")))
        .unwrap_or_else(|| output.trim().to_string());

    if extract_md_code_block(&content, FenceQuery::AnyLanguage).is_some() {
        return content;
    }

    if let Some(stripped) = content.strip_prefix("```") {
        content = stripped.to_string();
    }
    if let Some(stripped) = content.strip_suffix("```") {
        content = stripped.to_string();
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_without_fences() {
        assert_eq!(remove_markdown_code_block("No code block here."), "No code block here.");
    }

    #[test]
    fn empty_stays_empty() {
        assert_eq!(remove_markdown_code_block(""), "");
    }

    #[test]
    fn unwraps_md_block() {
        let text = "```md\nThis is inside md block.\n```";
        assert_eq!(remove_markdown_code_block(text), "This is inside md block.");
    }

    #[test]
    fn unwraps_markdown_block_with_surrounding_text() {
        let text = "Here you go:\n```markdown\n# Title\nBody.\n```\nThanks!";
        assert_eq!(remove_markdown_code_block(text), "# Title\nBody.");
    }

    #[test]
    fn unwraps_bare_block() {
        let text = "```\nplain content\n```";
        assert_eq!(remove_markdown_code_block(text), "plain content");
    }

    #[test]
    fn preserves_other_language_blocks() {
        let text = "```python\nMultiple lines\nare here.\n```";
        assert_eq!(remove_markdown_code_block(text), text);
    }

    #[test]
    fn preserves_nested_indented_fences() {
        let text = "```md\nIntro\n  ```python\n  print(1)\n  ```\nOutro\n```";
        assert_eq!(
            remove_markdown_code_block(text),
            "Intro\n  ```python\n  print(1)\n  ```\nOutro"
        );
    }

    #[test]
    fn extract_matches_language_case_insensitively() {
        let text = "```MD\nx\n```";
        assert_eq!(extract_md_code_block(text, FenceQuery::Language("md")), Some("x".into()));
    }

    #[test]
    fn extract_with_nested_block() {
        let text = "lead-in\n```yaml\nkey: value\nnested: |\n  ```python\n  print(\"Hello\")\n  ```\n```\n";
        let got = extract_md_code_block(text, FenceQuery::Language("yaml")).unwrap();
        assert_eq!(got, "key: value\nnested: |\n  ```python\n  print(\"Hello\")\n  ```");
    }

    #[test]
    fn unclosed_block_strips_leading_backticks() {
        assert_eq!(remove_markdown_code_block("```\nfoo"), "\nfoo");
    }

    #[test]
    fn extract_returns_none_without_close() {
        assert_eq!(extract_md_code_block("```md\nnever closed", FenceQuery::Language("md")), None);
    }
}
