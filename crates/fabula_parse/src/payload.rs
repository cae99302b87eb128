//! Ordered decode strategies over untrusted generated text.
//!
//! Strategies are pure `&str -> Option<Value>` functions evaluated
//! left-to-right with early exit. The strict decode runs first on the
//! fence-stripped text untouched, so well-formed payloads whose string
//! content legitimately contains curly quotes or `,]` sequences come back
//! byte-for-byte. Only after that fails do the mutating recovery passes
//! run (quote normalization, trailing-comma removal, permissive decode,
//! structural repair), each tried on the text and on every extracted
//! candidate substring.

use crate::{extract_balanced, extract_span_crude, repair_structure, sanitize, strip_fences};
use fabula_core::EntityKind;
use serde_json::Value;

/// Result of the payload parser.
///
/// `value` is the first decoded root matching the expected shape for the
/// kind. `diagnostic` describes the failure path (bracket counts, last
/// decode error) and exists only for observability — it never drives
/// control flow.
#[derive(Debug, Clone)]
pub struct ParsedPayload {
    /// Entity kind the payload was parsed for
    pub kind: EntityKind,
    /// Decoded root value, if any strategy matched
    pub value: Option<Value>,
    /// Name of the strategy that matched
    pub strategy: Option<&'static str>,
    /// Failure diagnostics; empty on success
    pub diagnostic: String,
}

type Strategy = (&'static str, fn(&str) -> Option<Value>);

fn decode_strict(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

fn decode_permissive(text: &str) -> Option<Value> {
    serde_json::from_str(&permissive_to_strict(text)).ok()
}

fn decode_strict_repaired(text: &str) -> Option<Value> {
    decode_strict(&repair_structure(text))
}

fn decode_permissive_repaired(text: &str) -> Option<Value> {
    decode_permissive(&repair_structure(text))
}

/// Strategies that run on sanitized text after the untouched strict pass
/// has failed. "sanitized" is the strict decoder again, now over text with
/// quotes normalized and trailing commas removed.
const RECOVERY_STRATEGIES: [Strategy; 4] = [
    ("sanitized", decode_strict),
    ("permissive", decode_permissive),
    ("strict+repair", decode_strict_repaired),
    ("permissive+repair", decode_permissive_repaired),
];

/// Rewrite permissive JSON-like text into strict JSON.
///
/// Converts single-quoted strings to double-quoted, quotes bare object
/// keys, and maps Python-style `True`/`False`/`None` literals.
fn permissive_to_strict(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 16);
    let mut in_double = false;
    let mut in_single = false;
    let mut escaped = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_double {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_double = false;
            }
            i += 1;
            continue;
        }
        if in_single {
            if escaped {
                escaped = false;
                // \' has no meaning in strict JSON; emit the bare quote.
                if c == '\'' {
                    out.push('\'');
                } else {
                    out.push('\\');
                    out.push(c);
                }
            } else if c == '\\' {
                escaped = true;
            } else if c == '\'' {
                in_single = false;
                out.push('"');
            } else if c == '"' {
                out.push('\\');
                out.push('"');
            } else {
                out.push(c);
            }
            i += 1;
            continue;
        }
        match c {
            '"' => {
                in_double = true;
                out.push(c);
            }
            '\'' => {
                in_single = true;
                out.push('"');
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                match word.as_str() {
                    "True" => out.push_str("true"),
                    "False" => out.push_str("false"),
                    "None" => out.push_str("null"),
                    _ => {
                        let mut j = i;
                        while j < chars.len() && chars[j].is_whitespace() {
                            j += 1;
                        }
                        if j < chars.len() && chars[j] == ':' {
                            // Bare object key.
                            out.push('"');
                            out.push_str(&word);
                            out.push('"');
                        } else {
                            out.push_str(&word);
                        }
                    }
                }
                continue;
            }
            _ => out.push(c),
        }
        i += 1;
    }
    out
}

fn root_shape_matches(kind: EntityKind, value: &Value) -> bool {
    value.is_object() || (value.is_array() && kind.accepts_array_root())
}

fn bracket_diagnostic(text: &str) -> String {
    let mut open_braces = 0usize;
    let mut close_braces = 0usize;
    let mut open_brackets = 0usize;
    let mut close_brackets = 0usize;
    for c in text.chars() {
        match c {
            '{' => open_braces += 1,
            '}' => close_braces += 1,
            '[' => open_brackets += 1,
            ']' => close_brackets += 1,
            _ => {}
        }
    }
    let decode_error = match serde_json::from_str::<Value>(text) {
        Ok(_) => "root shape mismatch".to_string(),
        Err(e) => e.to_string(),
    };
    format!(
        "no strategy matched: braces={open_braces}/{close_braces} brackets={open_brackets}/{close_brackets} error={decode_error}"
    )
}

fn candidates_for(text: &str) -> Vec<String> {
    let mut candidates = vec![text.to_string()];
    for extracted in [extract_balanced(text), extract_span_crude(text)]
        .into_iter()
        .flatten()
    {
        if !candidates.contains(&extracted) {
            candidates.push(extracted);
        }
    }
    candidates
}

/// Parse untrusted generated text into a payload root for `kind`.
///
/// Strips code fences, then attempts a strict decode of the untouched
/// text and its extracted candidate substrings. Only if that fails does
/// the text get sanitized (quotes normalized, trailing commas removed)
/// and run through the recovery strategies, returning the first result
/// whose root shape fits the kind.
///
/// # Examples
///
/// ```
/// use fabula_core::EntityKind;
/// use fabula_parse::parse_payload;
///
/// let payload = parse_payload(EntityKind::ChapterPlan, r#"{"chapters": []}"#);
/// assert_eq!(payload.strategy, Some("strict"));
///
/// let payload = parse_payload(EntityKind::ChapterPlan, "no structure here");
/// assert!(payload.value.is_none());
/// assert!(!payload.diagnostic.is_empty());
/// ```
pub fn parse_payload(kind: EntityKind, raw: &str) -> ParsedPayload {
    let stripped = strip_fences(raw);
    if stripped.is_empty() {
        return ParsedPayload {
            kind,
            value: None,
            strategy: None,
            diagnostic: "empty response".to_string(),
        };
    }

    // Well-formed text decodes untouched. Quote normalization and
    // trailing-comma removal would mutate string content that
    // legitimately contains curly quotes or ",]" sequences.
    for candidate in candidates_for(&stripped) {
        if let Some(value) = decode_strict(&candidate)
            && root_shape_matches(kind, &value)
        {
            tracing::debug!(kind = %kind, strategy = "strict", "Payload decoded");
            return ParsedPayload {
                kind,
                value: Some(value),
                strategy: Some("strict"),
                diagnostic: String::new(),
            };
        }
    }

    let sanitized = sanitize(&stripped);
    let candidates = candidates_for(&sanitized);
    for (name, strategy) in RECOVERY_STRATEGIES {
        for candidate in &candidates {
            if let Some(value) = strategy(candidate)
                && root_shape_matches(kind, &value)
            {
                tracing::debug!(kind = %kind, strategy = name, "Payload decoded");
                return ParsedPayload {
                    kind,
                    value: Some(value),
                    strategy: Some(name),
                    diagnostic: String::new(),
                };
            }
        }
    }

    let diagnostic = bracket_diagnostic(&sanitized);
    tracing::debug!(kind = %kind, diagnostic = %diagnostic, "Payload decode failed");
    ParsedPayload {
        kind,
        value: None,
        strategy: None,
        diagnostic,
    }
}
