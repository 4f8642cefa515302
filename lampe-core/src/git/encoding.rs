//! Encoding utilities for git command output.

use std::borrow::Cow;

/// Decodes raw subprocess bytes into valid UTF-8.
///
/// Invalid sequences (including CESU-8 encoded surrogate pairs, which show
/// up in binary files and files with mislabeled encodings) are replaced
/// with U+FFFD. The result always re-encodes as valid UTF-8 and contains
/// no surrogate code points.
pub fn sanitize_utf8(bytes: &[u8]) -> String {
    match String::from_utf8_lossy(bytes) {
        Cow::Borrowed(s) => s.to_string(),
        Cow::Owned(s) => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_text_passes_through() {
        assert_eq!(sanitize_utf8(b"Valid text"), "Valid text");
        assert_eq!(sanitize_utf8("héllo ✓".as_bytes()), "héllo ✓");
    }

    #[test]
    fn invalid_sequences_are_replaced() {
        let out = sanitize_utf8(b"ok \xff\xfe end");
        assert!(out.contains('\u{FFFD}'));
        assert!(out.starts_with("ok "));
        assert!(out.ends_with(" end"));
    }

    #[test]
    fn surrogate_bytes_are_replaced() {
        // CESU-8 encoding of U+D800 (a lone surrogate).
        let out = sanitize_utf8(b"text \xed\xa0\x80");
        assert!(out.chars().all(|c| !(0xD800..=0xDFFF).contains(&(c as u32))));
        assert!(out.contains('\u{FFFD}'));
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(sanitize_utf8(b""), "");
    }
}
