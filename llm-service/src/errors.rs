//! Unified error type for LLM calls.
//!
//! All vendor failures are normalized here so callers can branch on kind
//! rather than vendor. HTTP failures keep a short response snippet for
//! diagnostics without dumping whole bodies into logs.

use thiserror::Error;

/// Convenient alias for LLM operations.
pub type LlmResult<T> = Result<T, LlmError>;

/// Maximum length of a captured response-body snippet.
const SNIPPET_MAX: usize = 300;

#[derive(Debug, Error)]
pub enum LlmError {
    /// Config did not match the service being constructed.
    #[error("invalid provider for this service: {0}")]
    InvalidProvider(String),

    /// The vendor requires an API key and none was configured.
    #[error("missing API key for {0}")]
    MissingApiKey(&'static str),

    /// Endpoint did not look like an HTTP(S) URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Non-2xx status from the vendor.
    #[error("{provider} returned HTTP {status}: {snippet}")]
    HttpStatus {
        provider: &'static str,
        status: u16,
        snippet: String,
    },

    /// Transport-level failure (connect, TLS, timeout).
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body did not decode into the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// The vendor returned a response with no usable content.
    #[error("empty response from {0}")]
    EmptyResponse(&'static str),
}

/// Trims a response body into a single-line snippet for error messages.
pub fn make_snippet(body: &str) -> String {
    let flat = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.len() > SNIPPET_MAX {
        let mut cut = SNIPPET_MAX;
        while !flat.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}…", &flat[..cut])
    } else {
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_flattens_and_caps() {
        let body = "line one\n  line   two\n".to_string() + &"x".repeat(500);
        let s = make_snippet(&body);
        assert!(s.starts_with("line one line two"));
        assert!(s.chars().count() <= SNIPPET_MAX + 1);
        assert!(s.ends_with('…'));
    }

    #[test]
    fn snippet_keeps_short_bodies() {
        assert_eq!(make_snippet("{\"error\": \"bad\"}"), "{\"error\": \"bad\"}");
    }
}
