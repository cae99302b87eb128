//! Prompt assembly for generation, repair, and consistency round-trips.
//!
//! Prompt wording is deliberately minimal; the real product templates are
//! an external concern. What matters here is the contract each prompt
//! states: JSON only, the expected top-level key, and the index range.

use fabula_core::{EntityKind, GenerationRequest};
use regex::Regex;
use std::sync::LazyLock;

static CUSTOM_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,，;；|/→\-\n]+").expect("valid regex"));

fn schema_hint(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Character => {
            r#"{"characters": [{"name": "", "role": "", "gender": "", "age": "", "identity": "", "personality": "", "motivation": ""}]}"#
        }
        EntityKind::OutlinePhase => {
            r#"{"outline": [{"phase": 1, "label": "", "summary": "", "word_range": ""}]}"#
        }
        EntityKind::WorldEntry => {
            r#"{"world": [{"title": "", "category": "", "content": ""}]}"#
        }
        EntityKind::ChapterPlan => {
            r#"{"chapters": [{"chapter_num": 1, "title": "", "summary": "", "goal": ""}]}"#
        }
    }
}

/// Prompt for one batch-sized generation call.
pub fn batch_prompt(batch: GenerationRequest) -> String {
    let coverage = if batch.kind.is_indexed() {
        format!(
            "Cover every index from {} to {} inclusive, one item per index.",
            batch.range.start, batch.range.end
        )
    } else {
        format!(
            "Produce between {} and {} items.",
            batch.range.start, batch.range.end
        )
    };
    format!(
        "Generate the '{kind}' planning section. {coverage}\n\
         Output ONLY valid JSON matching this shape, with no commentary:\n{schema}",
        kind = batch.kind,
        schema = schema_hint(batch.kind),
    )
}

/// Outline variant of [`batch_prompt`]: names the phase labels resolved
/// from the caller's structure preset, in order.
pub fn outline_prompt(batch: GenerationRequest, labels: &[String]) -> String {
    format!(
        "{base}\nUse these phase labels in order: {labels}.",
        base = batch_prompt(batch),
        labels = labels.join(", "),
    )
}

/// Prompt asking the service to fix formatting of its own output without
/// changing content. Sent at minimal randomness.
pub fn repair_prompt(kind: EntityKind, malformed: &str) -> String {
    format!(
        "The following text was meant to be valid JSON for the '{kind}' section \
         but is malformed. Fix the formatting ONLY. Do not add, remove, or reword \
         any content. Output ONLY the corrected JSON.\n\n{malformed}"
    )
}

/// Prompt for a structurally-simpler regeneration emphasizing validity
/// over content richness.
pub fn minimal_prompt(batch: GenerationRequest) -> String {
    format!(
        "{base}\nKeep every field short and plain. Valid JSON structure matters \
         more than rich content. No nested objects beyond the shape shown.",
        base = batch_prompt(batch),
    )
}

/// Prompt for one bounded consistency-fix round-trip.
pub fn consistency_fix_prompt(kind: EntityKind, records_json: &str, problems: &str) -> String {
    format!(
        "The following '{kind}' records contain consistency problems:\n{problems}\n\
         Rewrite ONLY the offending phrases; change nothing else. \
         Output ONLY the corrected JSON in the same shape.\n\n{records_json}"
    )
}

/// Resolve outline phase labels from a structure preset.
///
/// `custom` is consulted only for the "custom" preset and is split on
/// common delimiters, capped at 12 labels.
///
/// # Examples
///
/// ```
/// use fabula_pipeline::phase_labels;
///
/// assert_eq!(phase_labels("three_act", "").len(), 3);
/// assert_eq!(phase_labels("custom", "Hook / Spiral / Collapse"), vec![
///     "Hook".to_string(), "Spiral".to_string(), "Collapse".to_string(),
/// ]);
/// assert_eq!(phase_labels("", "").len(), 4);
/// ```
pub fn phase_labels(structure: &str, custom: &str) -> Vec<String> {
    match structure.trim() {
        "three_act" => vec!["Act One".into(), "Act Two".into(), "Act Three".into()],
        "heros_journey" => vec![
            "Ordinary World".into(),
            "Call to Adventure".into(),
            "Crossing the Threshold".into(),
            "Trials and Allies".into(),
            "The Ordeal".into(),
            "The Reward".into(),
            "The Road Back".into(),
            "Return Transformed".into(),
        ],
        "custom" => {
            let labels: Vec<String> = CUSTOM_SPLIT
                .split(custom)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .take(12)
                .map(String::from)
                .collect();
            if labels.is_empty() {
                default_labels()
            } else {
                labels
            }
        }
        _ => default_labels(),
    }
}

fn default_labels() -> Vec<String> {
    vec![
        "Setup".into(),
        "Development".into(),
        "Turn".into(),
        "Resolution".into(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabula_core::IndexRange;

    #[test]
    fn batch_prompt_states_range_for_indexed_kinds() {
        let prompt = batch_prompt(GenerationRequest {
            kind: EntityKind::ChapterPlan,
            range: IndexRange::new(21, 40),
        });
        assert!(prompt.contains("21"));
        assert!(prompt.contains("40"));
        assert!(prompt.contains("ONLY valid JSON"));
    }

    #[test]
    fn outline_prompt_names_preset_labels() {
        let prompt = outline_prompt(
            GenerationRequest {
                kind: EntityKind::OutlinePhase,
                range: IndexRange::new(1, 3),
            },
            &phase_labels("three_act", ""),
        );
        assert!(prompt.contains("Act One, Act Two, Act Three"));
    }

    #[test]
    fn custom_labels_cap_at_twelve() {
        let custom = (1..=20).map(|n| format!("Beat{n}")).collect::<Vec<_>>().join(", ");
        assert_eq!(phase_labels("custom", &custom).len(), 12);
    }

    #[test]
    fn empty_custom_falls_back_to_default() {
        assert_eq!(phase_labels("custom", "  "), phase_labels("", ""));
    }
}
