//! Small text helpers shared across the workspace.

/// Clip a string to at most `limit` characters, trimming surrounding
/// whitespace first.
///
/// Operates on `char` boundaries, so multi-byte text is never split
/// mid-character.
///
/// # Examples
///
/// ```
/// use fabula_core::clip;
///
/// assert_eq!(clip("  hello world  ", 5), "hello");
/// assert_eq!(clip("short", 40), "short");
/// ```
pub fn clip(text: &str, limit: usize) -> String {
    text.trim().chars().take(limit).collect()
}

/// Collapse a key to a case- and whitespace-insensitive comparison form.
///
/// Used for de-duplication and alias matching: `"Chapter Num"`,
/// `"chapter_num"` and `"chapterNum"` all squash to `"chapternum"`.
pub fn squash_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Markers that make a generated name placeholder-shaped rather than a
/// real name.
const PLACEHOLDER_MARKERS: [&str; 8] = [
    "tbd", "n/a", "todo", "unknown", "unnamed", "placeholder", "未命名", "待定",
];

/// Whether a name looks like a generation placeholder instead of real
/// content.
///
/// Catches empty/one-character names, marker words, and the
/// `"Character A"` / `"角色A"` template shape.
///
/// # Examples
///
/// ```
/// use fabula_core::is_placeholder_name;
///
/// assert!(is_placeholder_name("TBD"));
/// assert!(is_placeholder_name("Character A"));
/// assert!(!is_placeholder_name("Mirelle Vance"));
/// ```
pub fn is_placeholder_name(name: &str) -> bool {
    let trimmed = name.trim();
    if trimmed.chars().count() < 2 {
        return true;
    }
    let lower = trimmed.to_lowercase();
    if PLACEHOLDER_MARKERS.iter().any(|m| lower == *m) {
        return true;
    }
    // Template shape: a generic noun followed by a single letter or digit,
    // e.g. "Character A", "角色B", "Hero 1".
    let mut words = trimmed.split_whitespace().collect::<Vec<_>>();
    if words.len() == 2 {
        let tail = words.pop().unwrap_or_default();
        let head = words.pop().unwrap_or_default().to_lowercase();
        let generic = matches!(head.as_str(), "character" | "hero" | "villain" | "person");
        if generic && tail.chars().count() == 1 {
            return true;
        }
    }
    if let Some(last) = trimmed.chars().last() {
        let head: String = trimmed.chars().take(trimmed.chars().count() - 1).collect();
        let generic_cn = matches!(head.as_str(), "角色" | "主角" | "反派" | "配角");
        if generic_cn && (last.is_ascii_alphanumeric()) {
            return true;
        }
    }
    false
}
