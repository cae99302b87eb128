//! Cross-batch consistency enforcement.
//!
//! Two checks run after normalization and before persistence:
//!
//! - **Premature mention**: a name -> earliest-allowed-index map (derived
//!   once from upstream planning text) is checked against every indexed
//!   record; a mention before its allowed index is a violation.
//! - **Stale range/volume label**: generated text sometimes embeds the
//!   range or volume label of an earlier batch.
//!
//! Fix order for both: one bounded ask-to-fix round-trip, then
//! deterministic substitution. Both checks are idempotent — re-running
//! after a fix produces no further change.

use fabula_core::{EntityKind, GenerateOptions, GenerateRequest, IndexRange, NormalizedRecord};
use fabula_interface::GenerationDriver;
use fabula_parse::{normalize_payload, parse_payload};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static RANGE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)chapters\s+(\d+)\s*[-–~]\s*(\d+)").expect("valid regex"));
static VOLUME_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)volume\s+(\d+)").expect("valid regex"));

/// A detected consistency violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A name mentioned before its earliest allowed index
    PrematureMention {
        /// The offending name
        name: String,
        /// Index of the record carrying the mention
        index: u32,
        /// Earliest index at which the name may appear
        earliest: u32,
    },
    /// A section-range label that does not match the current batch
    StaleRangeLabel {
        /// The label text as found
        found: String,
    },
    /// A volume label that does not match the current volume
    StaleVolumeLabel {
        /// The label text as found
        found: String,
    },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PrematureMention { name, index, earliest } => write!(
                f,
                "'{name}' mentioned at index {index}, not allowed before {earliest}"
            ),
            Self::StaleRangeLabel { found } => write!(f, "stale range label '{found}'"),
            Self::StaleVolumeLabel { found } => write!(f, "stale volume label '{found}'"),
        }
    }
}

/// Cross-batch consistency enforcer.
///
/// Constructed once per range job from upstream planning text; the
/// mention map and expected volume are immutable afterwards.
///
/// # Examples
///
/// ```
/// use fabula_pipeline::ConsistencyEnforcer;
/// use std::collections::BTreeMap;
///
/// let mut earliest = BTreeMap::new();
/// earliest.insert("The Pale Broker".to_string(), 12);
/// let enforcer = ConsistencyEnforcer::new(earliest).with_expected_volume(2);
/// ```
#[derive(Debug, Clone)]
pub struct ConsistencyEnforcer {
    earliest_mention: BTreeMap<String, u32>,
    expected_volume: Option<u32>,
    placeholder: String,
}

impl ConsistencyEnforcer {
    /// Create an enforcer from a precomputed name -> earliest-index map.
    pub fn new(earliest_mention: BTreeMap<String, u32>) -> Self {
        Self {
            earliest_mention,
            expected_volume: None,
            placeholder: "someone".to_string(),
        }
    }

    /// Enable the volume-label check against the given volume number.
    pub fn with_expected_volume(mut self, volume: u32) -> Self {
        self.expected_volume = Some(volume);
        self
    }

    /// Override the neutral placeholder used for deterministic
    /// substitution.
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// Detect all violations in a record set for the current batch range.
    pub fn detect(&self, records: &[NormalizedRecord], range: IndexRange) -> Vec<Violation> {
        let mut violations = Vec::new();
        for record in records {
            for field in record.text_fields() {
                if let Some(index) = record.index() {
                    for (name, &earliest) in &self.earliest_mention {
                        if index < earliest && field.contains(name.as_str()) {
                            let violation = Violation::PrematureMention {
                                name: name.clone(),
                                index,
                                earliest,
                            };
                            if !violations.contains(&violation) {
                                violations.push(violation);
                            }
                        }
                    }
                }
                for caps in RANGE_LABEL.captures_iter(field) {
                    let start: u32 = caps[1].parse().unwrap_or(0);
                    let end: u32 = caps[2].parse().unwrap_or(0);
                    if start != range.start || end != range.end {
                        let violation = Violation::StaleRangeLabel {
                            found: caps[0].to_string(),
                        };
                        if !violations.contains(&violation) {
                            violations.push(violation);
                        }
                    }
                }
                if let Some(expected) = self.expected_volume {
                    for caps in VOLUME_LABEL.captures_iter(field) {
                        let volume: u32 = caps[1].parse().unwrap_or(0);
                        if volume != expected {
                            let violation = Violation::StaleVolumeLabel {
                                found: caps[0].to_string(),
                            };
                            if !violations.contains(&violation) {
                                violations.push(violation);
                            }
                        }
                    }
                }
            }
        }
        violations
    }

    /// Deterministic substitution pass: premature names become the neutral
    /// placeholder, stale labels are rewritten to the current ones.
    fn apply_fixes(&self, records: &mut [NormalizedRecord], range: IndexRange) {
        let current_range = format!("Chapters {}-{}", range.start, range.end);
        for record in records.iter_mut() {
            let index = record.index();
            for field in record.text_fields_mut() {
                if let Some(index) = index {
                    for (name, &earliest) in &self.earliest_mention {
                        if index < earliest && field.contains(name.as_str()) {
                            *field = field.replace(name.as_str(), &self.placeholder);
                        }
                    }
                }
                let rewritten = RANGE_LABEL.replace_all(field, current_range.as_str());
                if rewritten != *field {
                    *field = rewritten.into_owned();
                }
                if let Some(expected) = self.expected_volume {
                    let volume = format!("Volume {expected}");
                    let rewritten = VOLUME_LABEL.replace_all(field, volume.as_str());
                    if rewritten != *field {
                        *field = rewritten.into_owned();
                    }
                }
            }
            record.reclip();
        }
    }

    /// Enforce both checks on a record set.
    ///
    /// Performs at most one ask-to-fix round-trip through the driver; if
    /// the service response still violates (or fails to parse), falls back
    /// to deterministic substitution. The result always passes
    /// [`ConsistencyEnforcer::detect`] cleanly.
    pub async fn enforce<D: GenerationDriver + ?Sized>(
        &self,
        driver: &D,
        kind: EntityKind,
        range: IndexRange,
        mut records: Vec<NormalizedRecord>,
        options: &GenerateOptions,
    ) -> Vec<NormalizedRecord> {
        let violations = self.detect(&records, range);
        if violations.is_empty() {
            return records;
        }
        tracing::info!(
            kind = %kind,
            range = %range,
            count = violations.len(),
            "Consistency violations detected, attempting service fix"
        );

        let problems = violations
            .iter()
            .map(|v| format!("- {v}"))
            .collect::<Vec<_>>()
            .join("\n");
        let records_json = serde_json::json!({ kind.to_string(): records }).to_string();
        let request = GenerateRequest::from_prompt(crate::prompts::consistency_fix_prompt(
            kind,
            &records_json,
            &problems,
        ))
        .with_options(options.minimal_randomness());

        if let Ok(response) = driver.generate(&request).await {
            let payload = parse_payload(kind, &response.text);
            if let Some(value) = payload.value.as_ref() {
                let range_filter = kind.is_indexed().then_some(range);
                let fixed = normalize_payload(kind, value, range_filter);
                if fixed.len() == records.len() && self.detect(&fixed, range).is_empty() {
                    tracing::debug!(kind = %kind, "Service fix accepted");
                    return fixed;
                }
            }
        }

        tracing::info!(kind = %kind, "Falling back to deterministic substitution");
        self.apply_fixes(&mut records, range);
        debug_assert!(self.detect(&records, range).is_empty());
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabula_core::ChapterPlanRecord;

    fn plan(n: u32, summary: &str) -> NormalizedRecord {
        NormalizedRecord::ChapterPlan(ChapterPlanRecord {
            chapter_num: n,
            title: format!("Title {n}"),
            summary: summary.to_string(),
            goal: None,
        })
    }

    fn enforcer() -> ConsistencyEnforcer {
        let mut earliest = BTreeMap::new();
        earliest.insert("The Pale Broker".to_string(), 12);
        ConsistencyEnforcer::new(earliest).with_expected_volume(1)
    }

    #[test]
    fn detects_premature_mention() {
        let records = vec![plan(5, "The Pale Broker makes an offer.")];
        let violations = enforcer().detect(&records, IndexRange::new(1, 10));
        assert_eq!(violations.len(), 1);
        assert!(matches!(
            &violations[0],
            Violation::PrematureMention { earliest: 12, index: 5, .. }
        ));
    }

    #[test]
    fn mention_at_allowed_index_is_clean() {
        let records = vec![plan(12, "The Pale Broker makes an offer.")];
        assert!(enforcer().detect(&records, IndexRange::new(11, 20)).is_empty());
    }

    #[test]
    fn detects_stale_labels() {
        let records = vec![plan(
            21,
            "As planned in Chapters 1-20, Volume 2 opens the siege.",
        )];
        let violations = enforcer().detect(&records, IndexRange::new(21, 40));
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn repeated_stale_label_reported_once() {
        let records = vec![NormalizedRecord::ChapterPlan(ChapterPlanRecord {
            chapter_num: 21,
            title: "Chapters 1-20 recap".to_string(),
            summary: "Echoes of Chapters 1-20 linger.".to_string(),
            goal: None,
        })];
        let violations = enforcer().detect(&records, IndexRange::new(21, 40));
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn substitution_is_idempotent() {
        let e = enforcer();
        let mut records = vec![plan(
            5,
            "The Pale Broker returns, as set up in Chapters 1-4.",
        )];
        let range = IndexRange::new(5, 10);
        e.apply_fixes(&mut records, range);
        assert!(e.detect(&records, range).is_empty());
        let snapshot = records.clone();
        e.apply_fixes(&mut records, range);
        assert_eq!(records, snapshot);
        // The name is gone verbatim; the label is current.
        let NormalizedRecord::ChapterPlan(c) = &records[0] else {
            panic!("expected chapter plan");
        };
        assert!(!c.summary.contains("The Pale Broker"));
        assert!(c.summary.contains("Chapters 5-10"));
    }
}
