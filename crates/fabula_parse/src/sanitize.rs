//! Text sanitation for generated output.
//!
//! Strips markdown fences, normalizes curly punctuation to the straight
//! forms JSON expects, and removes trailing commas before closing
//! brackets.

use regex::Regex;
use std::sync::LazyLock;

static LEADING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```[a-zA-Z0-9_-]*[ \t]*\r?\n?").expect("valid regex"));
static TRAILING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*```\s*$").expect("valid regex"));
static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([}\]])").expect("valid regex"));

/// Strip markdown fence markers from a response.
///
/// Handles a fully fenced response (opening and closing markers) and a
/// truncated one where the closing fence never arrived. A fenced block
/// embedded mid-prose is unwrapped to its content.
///
/// # Examples
///
/// ```
/// use fabula_parse::strip_fences;
///
/// assert_eq!(strip_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
/// assert_eq!(strip_fences("plain text"), "plain text");
/// ```
pub fn strip_fences(raw: &str) -> String {
    let text = raw.trim();
    if text.starts_with("```") {
        let stripped = LEADING_FENCE.replace(text, "");
        let stripped = TRAILING_FENCE.replace(&stripped, "");
        return stripped.trim().to_string();
    }
    // Fenced block inside surrounding prose: unwrap the first block.
    if let Some(open) = text.find("```") {
        let after_marker = open + 3;
        let content_start = text[after_marker..]
            .find('\n')
            .map(|n| after_marker + n + 1)
            .unwrap_or(after_marker);
        if let Some(close) = text[content_start..].find("```") {
            return text[content_start..content_start + close].trim().to_string();
        }
        // Truncated response: no closing fence, take everything after it.
        return text[content_start..].trim().to_string();
    }
    text.to_string()
}

/// Normalize curly quotes to their straight equivalents.
///
/// # Examples
///
/// ```
/// use fabula_parse::normalize_quotes;
///
/// assert_eq!(normalize_quotes("\u{201C}title\u{201D}"), "\"title\"");
/// ```
pub fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{FF02}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{FF07}' => '\'',
            other => other,
        })
        .collect()
}

/// Remove trailing commas before closing brackets until stable.
///
/// A single pass can expose a new trailing comma (`,}]` cases), so the
/// substitution repeats to fixpoint.
///
/// # Examples
///
/// ```
/// use fabula_parse::strip_trailing_commas;
///
/// assert_eq!(strip_trailing_commas("[1, 2,]"), "[1, 2]");
/// assert_eq!(strip_trailing_commas("{\"a\": [1,],}"), "{\"a\": [1]}");
/// ```
pub fn strip_trailing_commas(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = TRAILING_COMMA.replace_all(&current, "$1").to_string();
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Full sanitation pass: fences, quotes, trailing commas.
pub fn sanitize(raw: &str) -> String {
    strip_trailing_commas(&normalize_quotes(&strip_fences(raw)))
}
