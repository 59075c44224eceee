//! Text helpers for model output and request payloads.
//!
//! Model completions often wrap their JSON in markdown fences or surround it
//! with chatter. These helpers strip that down to the candidate object text.
//! All truncation is by characters and never splits a UTF-8 sequence.

/// Markdown fence markers removed from model output, longest first.
const CODE_FENCES: [&str; 2] = ["```json", "```"];

/// Return at most the first `max_chars` characters of `s`.
pub fn take_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Number of characters (not bytes) in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Trim and remove every markdown code fence marker.
pub fn strip_code_fences(raw: &str) -> String {
    let mut clean = raw.trim().to_string();
    for fence in CODE_FENCES {
        clean = clean.replace(fence, "");
    }
    clean.trim().to_string()
}

/// Slice from the first `{` to the last `}` inclusive.
///
/// Returns the input unchanged when either brace is missing or the last `}`
/// comes before the first `{`.
pub fn extract_json_object(s: &str) -> &str {
    match (s.find('{'), s.rfind('}')) {
        (Some(start), Some(end)) if start <= end => &s[start..=end],
        _ => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_chars_ascii() {
        assert_eq!(take_chars("hello world", 5), "hello");
        assert_eq!(take_chars("hi", 5), "hi");
        assert_eq!(take_chars("", 5), "");
        assert_eq!(take_chars("abc", 0), "");
    }

    #[test]
    fn test_take_chars_multibyte() {
        let s = "héllo ✓ wörld";
        assert_eq!(take_chars(s, 7), "héllo ✓");
        assert_eq!(char_len(take_chars(s, 7)), 7);
    }

    #[test]
    fn test_char_len_counts_chars() {
        assert_eq!(char_len("✓✓✓"), 3);
        assert_eq!("✓✓✓".len(), 9);
    }

    #[test]
    fn test_strip_code_fences() {
        let raw = "  ```json\n{\"a\": 1}\n```  ";
        assert_eq!(strip_code_fences(raw), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("{}"), "{}");
    }

    #[test]
    fn test_extract_json_object() {
        assert_eq!(
            extract_json_object("Sure! Here you go: {\"a\": {\"b\": 2}} Hope it helps."),
            "{\"a\": {\"b\": 2}}"
        );
        assert_eq!(extract_json_object("no braces"), "no braces");
        assert_eq!(extract_json_object("only { open"), "only { open");
    }

    #[test]
    fn test_extract_json_object_inverted_braces() {
        assert_eq!(extract_json_object("} then {"), "} then {");
    }
}
