//! Token counting and truncation.
//!
//! Uses the o200k BPE encoding. Diffs occasionally contain sentinel
//! strings like `<|endoftext|>`; those are encoded as ordinary text
//! rather than rejected or mapped to special-token ids.

use std::sync::OnceLock;

use tiktoken_rs::{CoreBPE, o200k_base};
use tracing::warn;

use crate::errors::Error;

/// Above this many characters the content is pre-truncated before encoding,
/// for encoder performance (3-4 characters per token).
pub const CHARACTER_TRUNCATION_THRESHOLD: usize = 200_000;

fn encoder() -> &'static CoreBPE {
    static ENCODER: OnceLock<CoreBPE> = OnceLock::new();
    ENCODER.get_or_init(|| o200k_base().expect("o200k BPE tables ship with the library"))
}

/// Number of BPE tokens in `content`.
pub fn count_token_string(content: &str) -> usize {
    encoder().encode_ordinary(content).len()
}

/// Truncates to `limit` characters on a char boundary.
pub fn safe_truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Truncates `content` to at most `max_tokens` BPE tokens.
///
/// Content longer than [`CHARACTER_TRUNCATION_THRESHOLD`] characters is
/// first cut to that many characters before encoding.
///
/// # Errors
/// [`Error::Validation`] when `max_tokens` is zero.
pub fn truncate_to_token_limit(content: &str, max_tokens: usize) -> Result<String, Error> {
    if max_tokens == 0 {
        return Err(Error::Validation("max_tokens must be a positive integer".into()));
    }

    let content = if content.len() >= CHARACTER_TRUNCATION_THRESHOLD {
        warn!(
            content_len = content.len(),
            threshold = CHARACTER_TRUNCATION_THRESHOLD,
            "truncating content before encoding for performance"
        );
        safe_truncate(content, CHARACTER_TRUNCATION_THRESHOLD)
    } else {
        content
    };

    let tokens = encoder().encode_ordinary(content);
    if tokens.len() <= max_tokens {
        return Ok(content.to_string());
    }
    encoder()
        .decode(tokens[..max_tokens].to_vec())
        .map_err(|e| Error::Validation(format!("token decode failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_token_limit() {
        let content: String = (0..100).map(|i| format!("Hello, world {i}!")).collect();
        let out = truncate_to_token_limit(&content, 2).unwrap();
        assert!(count_token_string(&out) <= 2);
        assert!(content.starts_with(&out));
    }

    #[test]
    fn zero_limit_is_an_error() {
        assert!(truncate_to_token_limit("anything", 0).is_err());
    }

    #[test]
    fn short_content_is_untouched() {
        let content = "short and sweet";
        assert_eq!(truncate_to_token_limit(content, 10_000).unwrap(), content);
    }

    #[test]
    fn oversized_content_is_pre_truncated() {
        let content = "a".repeat(CHARACTER_TRUNCATION_THRESHOLD + 50_000);
        let out = truncate_to_token_limit(&content, 50_000).unwrap();
        assert!(out.len() <= CHARACTER_TRUNCATION_THRESHOLD);
    }

    #[test]
    fn special_token_text_encodes_as_ordinary_text() {
        let content = "before <|endoftext|> after";
        let out = truncate_to_token_limit(content, 10_000).unwrap();
        assert_eq!(out, content);
        // The sentinel is several BPE tokens, not one special id.
        assert!(count_token_string("<|endoftext|>") > 1);
    }

    #[test]
    fn safe_truncate_respects_char_boundaries() {
        let text = "héllo wörld";
        assert_eq!(safe_truncate(text, 5), "héllo");
        assert_eq!(safe_truncate(text, 100), text);
    }

    #[test]
    fn decoded_prefix_is_a_prefix_in_tokens() {
        let content = "The quick brown fox jumps over the lazy dog. ".repeat(20);
        let full = encoder().encode_ordinary(&content);
        let out = truncate_to_token_limit(&content, 7).unwrap();
        let prefix = encoder().encode_ordinary(&out);
        assert_eq!(&full[..prefix.len()], &prefix[..]);
    }
}
