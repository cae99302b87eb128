//! Structural repair of JSON-like text.
//!
//! The repairer scans character by character, tracking quote state
//! (honoring escape sequences) and the nesting of `{}`/`[]`. A quote is
//! treated as string-terminating only if the next non-whitespace character
//! is one of `, } ] :` or end-of-input; otherwise it is an unescaped
//! interior quote and gets escaped instead of closing the string. Any
//! string still open at end-of-input is closed, and unclosed brackets are
//! closed in LIFO order.

/// Characters that may legitimately follow a closing quote in JSON.
fn closes_string(chars: &[char], mut idx: usize) -> bool {
    while idx < chars.len() {
        let c = chars[idx];
        if c.is_whitespace() {
            idx += 1;
            continue;
        }
        return matches!(c, ',' | '}' | ']' | ':');
    }
    // End of input: a truncated response cut off right after the quote.
    true
}

/// Repair bracket/quote balance in JSON-like text.
///
/// # Examples
///
/// ```
/// use fabula_parse::repair_structure;
///
/// // Two closing brackets missing at the end.
/// let repaired = repair_structure("{\"items\": [{\"id\": 1}");
/// assert_eq!(repaired, "{\"items\": [{\"id\": 1}]}");
///
/// // Unescaped interior quote.
/// let repaired = repair_structure("{\"line\": \"she said \"go\" now\"}");
/// assert!(serde_json::from_str::<serde_json::Value>(&repaired).is_ok());
/// ```
pub fn repair_structure(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(c);
            } else if c == '\\' {
                escaped = true;
                out.push(c);
            } else if c == '"' {
                if closes_string(&chars, i + 1) {
                    in_string = false;
                    out.push(c);
                } else {
                    out.push('\\');
                    out.push('"');
                }
            } else {
                out.push(c);
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '{' | '[' => {
                stack.push(c);
                out.push(c);
            }
            '}' | ']' => match stack.last() {
                Some(&open) => {
                    stack.pop();
                    out.push(if open == '{' { '}' } else { ']' });
                }
                // Stray closer with nothing open: drop it.
                None => {}
            },
            _ => out.push(c),
        }
    }

    if in_string {
        out.push('"');
    }
    while let Some(open) = stack.pop() {
        out.push(if open == '{' { '}' } else { ']' });
    }
    out
}

/// Extract the first balanced `{...}` or `[...]` span, honoring quote
/// state and escape sequences.
///
/// Quote state is tracked from the very start of the text, so an opener
/// inside a string does not count and a stray quote before the payload
/// poisons the scan (that case falls through to [`extract_span_crude`]).
/// The first opener found outside a string chooses the bracket pair.
/// Returns `None` when no balanced span closes before end-of-input.
pub fn extract_balanced(text: &str) -> Option<String> {
    let mut in_string = false;
    let mut escaped = false;
    let mut pair: Option<(usize, char, char)> = None;
    let mut depth = 0usize;

    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => in_string = !in_string,
            '{' | '[' if !in_string && pair.is_none() => {
                let close = if c == '{' { '}' } else { ']' };
                pair = Some((i, c, close));
                depth = 1;
            }
            c if !in_string => {
                if let Some((start, open, close)) = pair {
                    if c == open {
                        depth += 1;
                    } else if c == close {
                        depth -= 1;
                        if depth == 0 {
                            return Some(text[start..i + c.len_utf8()].to_string());
                        }
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Extract the first balanced span counting bracket characters alone,
/// ignoring quote state entirely.
///
/// Used when quote-aware extraction fails on pathological input (e.g. an
/// odd number of quotes that poisons string tracking).
pub fn extract_span_crude(text: &str) -> Option<String> {
    let brace = text.find('{');
    let bracket = text.find('[');
    let (open, close) = match (brace, bracket) {
        (Some(b), Some(k)) if k < b => ('[', ']'),
        (Some(_), _) => ('{', '}'),
        (None, Some(_)) => ('[', ']'),
        (None, None) => return None,
    };
    let start = text.find(open)?;
    let mut depth = 0usize;
    for (i, c) in text[start..].char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(text[start..start + i + c.len_utf8()].to_string());
            }
        }
    }
    None
}
