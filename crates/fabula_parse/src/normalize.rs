//! Per-kind schema normalization of decoded payloads.
//!
//! One generic normalizer consumes a per-kind profile (list aliases, field
//! synonyms, length limits, enum sets, quality bars) instead of four
//! duplicated functions. Records that fail the minimal quality bars are
//! dropped rather than kept.

use fabula_core::{
    CharacterRecord, CharacterRole, ChapterPlanRecord, EntityKind, IndexRange, NormalizedRecord,
    OutlinePhaseRecord, WorldCategory, WorldEntryRecord, clip, is_placeholder_name, squash_key,
};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Wrapper keys a payload list may hide under, one level at a time.
const WRAPPER_KEYS: [&str; 7] = [
    "data", "result", "results", "payload", "output", "response", "content",
];

/// Maximum wrapper-descent depth before giving up.
const MAX_DESCENT: u8 = 4;

fn list_aliases(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Character => &["characters", "roster", "cast", "character_list", "items"],
        EntityKind::OutlinePhase => &["outline", "phases", "outline_phases", "acts", "items"],
        EntityKind::WorldEntry => &[
            "world",
            "worldbuilding",
            "world_entries",
            "entries",
            "settings",
            "items",
        ],
        EntityKind::ChapterPlan => &["chapters", "chapter_plans", "plans", "chapter_list", "items"],
    }
}

/// Resolve a field across name synonyms, case/separator-insensitively.
fn get_field<'a>(map: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    for alias in aliases {
        if let Some(v) = map.get(*alias) {
            return Some(v);
        }
    }
    for (key, v) in map {
        let squashed = squash_key(key);
        if aliases.iter().any(|a| squash_key(a) == squashed) {
            return Some(v);
        }
    }
    None
}

fn field_string(map: &Map<String, Value>, aliases: &[&str]) -> String {
    get_field(map, aliases).map(value_to_string).unwrap_or_default()
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Parse a numeric field with safe defaults: accepts numbers and strings
/// containing a digit run ("3", "第3章", "chapter 3").
fn value_to_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => {
            let digits: String = s
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

/// Locate the target list under known aliases or common wrapper keys,
/// descending at most [`MAX_DESCENT`] levels.
fn locate_list<'a>(value: &'a Value, aliases: &[&str], depth: u8) -> Option<&'a Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => {
            if depth == 0 {
                return None;
            }
            if let Some(candidate) = get_field(map, aliases)
                && let Some(items) = locate_list(candidate, aliases, depth - 1)
            {
                return Some(items);
            }
            for wrapper in WRAPPER_KEYS {
                if let Some(candidate) = map.get(wrapper)
                    && let Some(items) = locate_list(candidate, aliases, depth - 1)
                {
                    return Some(items);
                }
            }
            // Last resort: an object with exactly one array value.
            let mut arrays = map.values().filter(|v| v.is_array());
            if let (Some(Value::Array(items)), None) = (arrays.next(), arrays.next()) {
                return Some(items);
            }
            None
        }
        _ => None,
    }
}

/// Normalize a gender value to a small closed vocabulary.
///
/// # Examples
///
/// ```
/// use fabula_parse::normalize_gender;
///
/// assert_eq!(normalize_gender("Female"), "female");
/// assert_eq!(normalize_gender("男"), "male");
/// assert_eq!(normalize_gender("not stated"), "unknown");
/// ```
pub fn normalize_gender(raw: &str) -> String {
    let v = raw.trim();
    if v.is_empty() {
        return String::new();
    }
    let lower = v.to_lowercase();
    if lower.contains("non-binary") || lower.contains("nonbinary") || v.contains("非二元") {
        return "nonbinary".to_string();
    }
    if lower.contains("female") || lower.contains("woman") || lower.contains("girl") || v.contains('女') {
        return "female".to_string();
    }
    if lower.contains("male") || lower.contains("man") || lower.contains("boy") || v.contains('男') {
        return "male".to_string();
    }
    if lower.contains("unknown") || lower.contains("unspecified") || lower.contains("not stated")
        || v.contains("未知")
    {
        return "unknown".to_string();
    }
    clip(v, 12)
}

/// Normalize an age value: bare numbers are bounds-checked, unknown
/// markers collapse to "unknown", anything else is clipped verbatim.
///
/// # Examples
///
/// ```
/// use fabula_parse::normalize_age;
///
/// assert_eq!(normalize_age(" 27 "), "27");
/// assert_eq!(normalize_age("n/a"), "unknown");
/// assert_eq!(normalize_age("late twenties"), "late twenties");
/// ```
pub fn normalize_age(raw: &str) -> String {
    let v: String = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if v.is_empty() {
        return String::new();
    }
    let lower = v.to_lowercase();
    if lower == "n/a" || lower == "na" || lower.contains("unknown") || lower.contains("unspecified")
        || v.contains("未知")
    {
        return "unknown".to_string();
    }
    if v.chars().all(|c| c.is_ascii_digit())
        && let Ok(n) = v.parse::<u32>()
        && n > 0
        && n < 160
    {
        return n.to_string();
    }
    clip(&v, 20)
}

fn normalize_character(map: &Map<String, Value>) -> Option<NormalizedRecord> {
    let name = clip(&field_string(map, &["name", "character_name", "char_name", "角色名"]), 40);
    if is_placeholder_name(&name) {
        return None;
    }
    let identity = clip(
        &field_string(map, &["identity", "description", "summary", "bio", "background"]),
        200,
    );
    if identity.chars().count() < 6 {
        return None;
    }
    Some(NormalizedRecord::Character(CharacterRecord {
        name,
        role: CharacterRole::coerce(&field_string(map, &["role", "category", "type", "position"])),
        gender: normalize_gender(&field_string(map, &["gender", "sex", "性别"])),
        age: normalize_age(&field_string(map, &["age", "年龄"])),
        identity,
        personality: clip(&field_string(map, &["personality", "traits", "temperament"]), 260),
        motivation: clip(&field_string(map, &["motivation", "goal", "desire", "drive"]), 260),
    }))
}

fn normalize_outline(map: &Map<String, Value>, position: usize) -> Option<NormalizedRecord> {
    let phase = get_field(map, &["phase", "index", "order", "num", "phase_num"])
        .and_then(value_to_u32)
        .unwrap_or(position as u32 + 1);
    if phase == 0 {
        return None;
    }
    let summary = clip(
        &field_string(map, &["summary", "description", "content", "plot", "events"]),
        500,
    );
    if summary.chars().count() < 6 {
        return None;
    }
    let mut label = clip(&field_string(map, &["label", "name", "title", "phase_name"]), 40);
    if label.is_empty() {
        label = format!("Phase {phase}");
    }
    let word_range = clip(&field_string(map, &["word_range", "words", "word_count"]), 40);
    Some(NormalizedRecord::OutlinePhase(OutlinePhaseRecord {
        phase,
        label,
        summary,
        word_range: (!word_range.is_empty()).then_some(word_range),
    }))
}

fn normalize_world(map: &Map<String, Value>) -> Option<NormalizedRecord> {
    let title = clip(&field_string(map, &["title", "name", "entry", "条目"]), 40);
    if is_placeholder_name(&title) {
        return None;
    }
    let content = clip(
        &field_string(map, &["content", "description", "detail", "summary"]),
        500,
    );
    if content.chars().count() < 6 {
        return None;
    }
    Some(NormalizedRecord::WorldEntry(WorldEntryRecord {
        title,
        category: WorldCategory::coerce(&field_string(map, &["category", "type", "kind"])),
        content,
    }))
}

fn normalize_chapter(map: &Map<String, Value>, range: Option<IndexRange>) -> Option<NormalizedRecord> {
    let chapter_num = get_field(
        map,
        &["chapter_num", "chapter", "chapter_number", "num", "index"],
    )
    .and_then(value_to_u32)?;
    if chapter_num == 0 {
        return None;
    }
    if let Some(range) = range
        && !range.contains(chapter_num)
    {
        return None;
    }
    let mut title = clip(&field_string(map, &["title", "name", "chapter_title"]), 60);
    let summary = clip(
        &field_string(map, &["summary", "synopsis", "description", "content", "plot"]),
        500,
    );
    if title.is_empty() && summary.is_empty() {
        return None;
    }
    if title.is_empty() {
        title = ChapterPlanRecord::default_title(chapter_num);
    }
    let goal = clip(&field_string(map, &["goal", "objective", "purpose"]), 260);
    Some(NormalizedRecord::ChapterPlan(ChapterPlanRecord {
        chapter_num,
        title,
        summary,
        goal: (!goal.is_empty()).then_some(goal),
    }))
}

/// Normalize a decoded payload root into validated records for `kind`.
///
/// Locates the target list, normalizes each item, and de-duplicates by
/// natural key (case/whitespace-insensitive for named kinds). For indexed
/// kinds, records outside `range` are dropped.
///
/// # Examples
///
/// ```
/// use fabula_core::{EntityKind, IndexRange};
/// use fabula_parse::normalize_payload;
/// use serde_json::json;
///
/// let value = json!({"chapters": [
///     {"chapter_num": 1, "title": "A", "summary": "Opening move."},
///     {"chapter_num": 1, "title": "A again", "summary": "Duplicate."},
///     {"chapter_num": 9, "title": "Out of range", "summary": "Dropped."},
/// ]});
/// let records = normalize_payload(
///     EntityKind::ChapterPlan,
///     &value,
///     Some(IndexRange::new(1, 5)),
/// );
/// assert_eq!(records.len(), 1);
/// ```
pub fn normalize_payload(
    kind: EntityKind,
    value: &Value,
    range: Option<IndexRange>,
) -> Vec<NormalizedRecord> {
    let Some(items) = locate_list(value, list_aliases(kind), MAX_DESCENT) else {
        tracing::debug!(kind = %kind, "No target list found in payload");
        return Vec::new();
    };

    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut records = Vec::new();
    for (position, item) in items.iter().enumerate() {
        let Value::Object(map) = item else { continue };
        let normalized = match kind {
            EntityKind::Character => normalize_character(map),
            EntityKind::OutlinePhase => normalize_outline(map, position),
            EntityKind::WorldEntry => normalize_world(map),
            EntityKind::ChapterPlan => normalize_chapter(map, range),
        };
        let Some(record) = normalized else { continue };
        if seen.insert(record.natural_key()) {
            records.push(record);
        }
    }
    tracing::debug!(
        kind = %kind,
        raw = items.len(),
        kept = records.len(),
        "Normalized payload items"
    );
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn character_aliases_and_coercion() {
        let value = json!({"cast": [{
            "character_name": "Mirelle Vance",
            "type": "main lead",
            "sex": "Female",
            "年龄": "27",
            "bio": "Salvage pilot hunting her brother's wreck.",
        }]});
        let records = normalize_payload(EntityKind::Character, &value, None);
        assert_eq!(records.len(), 1);
        let NormalizedRecord::Character(c) = &records[0] else {
            panic!("expected character");
        };
        assert_eq!(c.role, CharacterRole::Protagonist);
        assert_eq!(c.gender, "female");
        assert_eq!(c.age, "27");
    }

    #[test]
    fn placeholder_names_are_dropped() {
        let value = json!({"characters": [
            {"name": "Character A", "description": "A placeholder person."},
            {"name": "TBD", "description": "Another placeholder body."},
        ]});
        assert!(normalize_payload(EntityKind::Character, &value, None).is_empty());
    }

    #[test]
    fn wrapper_descent_finds_nested_list() {
        let value = json!({"result": {"data": {"chapters": [
            {"chapter_num": 2, "title": "B", "summary": "Second move."},
        ]}}});
        let records = normalize_payload(EntityKind::ChapterPlan, &value, None);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn descent_gives_up_past_four_levels() {
        let value = json!({"data": {"data": {"data": {"data": {"data": {
            "chapters": [{"chapter_num": 1, "title": "Deep", "summary": "Too deep."}]
        }}}}}});
        assert!(normalize_payload(EntityKind::ChapterPlan, &value, None).is_empty());
    }

    #[test]
    fn chapters_deduplicate_and_respect_range() {
        let value = json!({"chapters": [
            {"chapter_num": 3, "title": "C", "summary": "Keep me."},
            {"chapter": "3", "title": "C again", "summary": "Duplicate index."},
            {"chapter_num": 99, "title": "Z", "summary": "Out of range."},
            {"title": "No number", "summary": "No key."},
        ]});
        let records =
            normalize_payload(EntityKind::ChapterPlan, &value, Some(IndexRange::new(1, 10)));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].natural_key(), "3");
    }

    #[test]
    fn chapter_number_parses_from_string_forms() {
        let value = json!({"chapters": [
            {"chapter": "第7章", "title": "Seven", "summary": "Numbered in prose."},
        ]});
        let records = normalize_payload(EntityKind::ChapterPlan, &value, None);
        assert_eq!(records[0].index(), Some(7));
    }

    #[test]
    fn named_dedupe_is_case_insensitive() {
        let value = json!({"world": [
            {"title": "The Drowned Court", "category": "faction", "content": "Rules the tideways."},
            {"title": "the drowned court", "category": "faction", "content": "Duplicate entry."},
        ]});
        let records = normalize_payload(EntityKind::WorldEntry, &value, None);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn outline_uses_position_when_phase_missing() {
        let value = json!({"outline": [
            {"label": "Setup", "summary": "Introduce the wreck."},
            {"label": "Turn", "summary": "The wreck answers back."},
        ]});
        let records = normalize_payload(EntityKind::OutlinePhase, &value, None);
        assert_eq!(records[0].index(), Some(1));
        assert_eq!(records[1].index(), Some(2));
    }

    #[test]
    fn single_array_fallback() {
        let value = json!({"stuff": [
            {"name": "Bel Harrow", "description": "Dock fixer with debts."},
        ]});
        let records = normalize_payload(EntityKind::Character, &value, None);
        assert_eq!(records.len(), 1);
    }
}
