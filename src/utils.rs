//! Shared text helpers: code-fence stripping for provider JSON, prompt
//! cleaning for URL-embedded prompts, and content hashing for cache keys.

use blake3::Hasher;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static FENCE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"```json\s*").unwrap());
static FENCE_ANY: Lazy<Regex> = Lazy::new(|| Regex::new(r"```\s*").unwrap());
static URL_HOSTILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s,.-]").unwrap());
static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Strip Markdown code fences (```json ... ``` or ``` ... ```) from a
/// provider response so the remainder can be handed to the JSON parser.
pub fn strip_code_fences(raw: &str) -> String {
    let no_json = FENCE_OPEN.replace_all(raw, "");
    let no_fence = FENCE_ANY.replace_all(&no_json, "");
    no_fence.trim().to_string()
}

/// Clean a prompt for embedding into an image-provider URL: replace
/// URL-hostile characters with spaces, collapse whitespace, cap length.
pub fn clean_url_prompt(prompt: &str, max_chars: usize) -> String {
    let replaced = URL_HOSTILE.replace_all(prompt, " ");
    let collapsed = MULTI_SPACE.replace_all(&replaced, " ");
    let trimmed = collapsed.trim();
    let mut out = trimmed.to_string();
    cap_text(&mut out, max_chars);
    out
}

/// Truncate in place to at most `max_len` bytes at a UTF-8 boundary
pub fn cap_text(text: &mut String, max_len: usize) {
    if text.len() <= max_len {
        return;
    }

    let mut end = max_len;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    *text = text[..end].to_string();
}

/// Percent-encode a string for embedding in a URL path segment.
/// Unreserved characters (RFC 3986) pass through; everything else,
/// including the spaces and commas left by `clean_url_prompt`, is encoded.
pub fn encode_url_component(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 3);
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            other => {
                out.push('%');
                out.push_str(&format!("{:02X}", other));
            }
        }
    }
    out
}

/// Hash content for cache keys: NFKC-normalize, lowercase, collapse
/// whitespace, then blake3
pub fn hash_content(text: &str) -> String {
    let normalized = text
        .nfkc()
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string();

    let mut hasher = Hasher::new();
    hasher.update(normalized.as_bytes());
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fences() {
        let raw = "```json\n{\"questions\": []}\n```";
        assert_eq!(strip_code_fences(raw), "{\"questions\": []}");
    }

    #[test]
    fn strips_bare_fences() {
        let raw = "```\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn leaves_clean_json_alone() {
        let raw = "{\"a\": 1}";
        assert_eq!(strip_code_fences(raw), raw);
    }

    #[test]
    fn cleans_url_hostile_characters() {
        let cleaned = clean_url_prompt("kurta & dhoti (silk)! très chic", 280);
        assert!(!cleaned.contains('&'));
        assert!(!cleaned.contains('('));
        assert!(!cleaned.contains("  "));
    }

    #[test]
    fn caps_at_utf8_boundary() {
        let mut text = "héllo wörld".repeat(50);
        cap_text(&mut text, 280);
        assert!(text.len() <= 280);
        assert!(text.is_char_boundary(text.len()));
    }

    #[test]
    fn encodes_spaces_and_commas() {
        assert_eq!(
            encode_url_component("silk kurta, beige dhoti"),
            "silk%20kurta%2C%20beige%20dhoti"
        );
        assert_eq!(encode_url_component("plain-text_1.0~ok"), "plain-text_1.0~ok");
    }

    #[test]
    fn hash_is_stable_under_whitespace_and_case() {
        let a = hash_content("Formal  Wedding\nEvening");
        let b = hash_content("formal wedding evening");
        assert_eq!(a, b);
        assert_ne!(a, hash_content("casual wedding evening"));
    }
}
