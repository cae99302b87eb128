//! Normalized planning records.
//!
//! One variant per entity kind. Records are produced by the schema
//! normalizer with every field already clipped to its maximum length, may
//! be rewritten by the consistency enforcer, and are then handed once to
//! the persister.

use crate::{EntityKind, clip, squash_key};
use serde::{Deserialize, Serialize};

/// Closed set of character roles.
///
/// Coercion accepts the canonical names and falls back to substring
/// containment, defaulting to [`CharacterRole::Supporting`].
///
/// # Examples
///
/// ```
/// use fabula_core::CharacterRole;
///
/// assert_eq!(CharacterRole::coerce("protagonist"), CharacterRole::Protagonist);
/// assert_eq!(CharacterRole::coerce("main antagonist"), CharacterRole::Antagonist);
/// assert_eq!(CharacterRole::coerce("???"), CharacterRole::Supporting);
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CharacterRole {
    /// Lead character
    Protagonist,
    /// Primary opposition
    Antagonist,
    /// Supporting cast
    Supporting,
    /// Anything else
    Other,
}

impl CharacterRole {
    /// Coerce free text into the closed role set.
    pub fn coerce(raw: &str) -> Self {
        let v = raw.trim().to_lowercase();
        if v.is_empty() {
            return Self::Supporting;
        }
        if v.contains("protag") || v.contains("main") || v.contains("lead") || v.contains("hero") {
            return Self::Protagonist;
        }
        if v.contains("antag") || v.contains("villain") || v.contains("opponent") {
            return Self::Antagonist;
        }
        if v.contains("support") || v.contains("side") || v.contains("secondary") {
            return Self::Supporting;
        }
        Self::Other
    }
}

/// Closed set of worldbuilding categories.
///
/// Coercion maps by substring containment and falls back to
/// [`WorldCategory::Other`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorldCategory {
    /// Power blocs and organizations
    Faction,
    /// Places and geography
    Location,
    /// Laws of the world: systems, institutions, magic rules
    Rule,
    /// Significant objects and artifacts
    Item,
    /// Backstory and past events
    History,
    /// Customs, beliefs, and daily life
    Culture,
    /// Anything else
    Other,
}

impl WorldCategory {
    /// Coerce free text into the closed category set.
    pub fn coerce(raw: &str) -> Self {
        let v = raw.trim().to_lowercase();
        const MAPPING: [(&str, WorldCategory); 10] = [
            ("faction", WorldCategory::Faction),
            ("organization", WorldCategory::Faction),
            ("guild", WorldCategory::Faction),
            ("location", WorldCategory::Location),
            ("place", WorldCategory::Location),
            ("geograph", WorldCategory::Location),
            ("rule", WorldCategory::Rule),
            ("system", WorldCategory::Rule),
            ("item", WorldCategory::Item),
            ("artifact", WorldCategory::Item),
        ];
        for (needle, target) in MAPPING {
            if v.contains(needle) {
                return target;
            }
        }
        if v.contains("histor") {
            return Self::History;
        }
        if v.contains("cultur") || v.contains("custom") {
            return Self::Culture;
        }
        Self::Other
    }
}

/// A character roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterRecord {
    /// Character name (clipped to 40 chars, never placeholder-shaped)
    pub name: String,
    /// Role in the story
    pub role: CharacterRole,
    /// Gender, normalized (clipped to 12 chars, may be empty)
    pub gender: String,
    /// Age, normalized (clipped to 20 chars, may be empty)
    pub age: String,
    /// Who the character is in the world (clipped to 200 chars)
    pub identity: String,
    /// Personality sketch (clipped to 260 chars)
    pub personality: String,
    /// What drives the character (clipped to 260 chars)
    pub motivation: String,
}

/// One phase of the story outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlinePhaseRecord {
    /// 1-based phase ordinal
    pub phase: u32,
    /// Phase label, e.g. a structure-preset beat name (clipped to 40 chars)
    pub label: String,
    /// What happens in this phase (clipped to 500 chars)
    pub summary: String,
    /// Optional word-count range such as "20000-30000"
    pub word_range: Option<String>,
}

/// A worldbuilding entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldEntryRecord {
    /// Entry title (clipped to 40 chars)
    pub title: String,
    /// Entry category
    pub category: WorldCategory,
    /// Entry body (clipped to 500 chars)
    pub content: String,
}

/// A per-chapter plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterPlanRecord {
    /// 1-based chapter number, the natural key within a project
    pub chapter_num: u32,
    /// Chapter title (clipped to 60 chars)
    pub title: String,
    /// Chapter summary (clipped to 500 chars)
    pub summary: String,
    /// Optional narrative goal for the chapter (clipped to 260 chars)
    pub goal: Option<String>,
}

impl ChapterPlanRecord {
    /// The title the pipeline assigns when generation produced none.
    pub fn default_title(chapter_num: u32) -> String {
        format!("Chapter {chapter_num}")
    }
}

/// A validated planning record, one variant per entity kind.
///
/// # Examples
///
/// ```
/// use fabula_core::{ChapterPlanRecord, EntityKind, NormalizedRecord};
///
/// let record = NormalizedRecord::ChapterPlan(ChapterPlanRecord {
///     chapter_num: 3,
///     title: "The Long Night".to_string(),
///     summary: "The crew loses the light.".to_string(),
///     goal: None,
/// });
///
/// assert_eq!(record.kind(), EntityKind::ChapterPlan);
/// assert_eq!(record.natural_key(), "3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizedRecord {
    /// Character roster entry
    Character(CharacterRecord),
    /// Outline phase
    OutlinePhase(OutlinePhaseRecord),
    /// Worldbuilding entry
    WorldEntry(WorldEntryRecord),
    /// Chapter plan
    ChapterPlan(ChapterPlanRecord),
}

impl NormalizedRecord {
    /// The entity kind of this record.
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Character(_) => EntityKind::Character,
            Self::OutlinePhase(_) => EntityKind::OutlinePhase,
            Self::WorldEntry(_) => EntityKind::WorldEntry,
            Self::ChapterPlan(_) => EntityKind::ChapterPlan,
        }
    }

    /// The caller-domain natural key used for idempotent upsert.
    ///
    /// Indexed kinds use their ordinal; named kinds use the squashed
    /// (case/whitespace-insensitive) name or title.
    pub fn natural_key(&self) -> String {
        match self {
            Self::Character(c) => squash_key(&c.name),
            Self::OutlinePhase(p) => p.phase.to_string(),
            Self::WorldEntry(w) => squash_key(&w.title),
            Self::ChapterPlan(c) => c.chapter_num.to_string(),
        }
    }

    /// The natural ordinal index for indexed kinds.
    pub fn index(&self) -> Option<u32> {
        match self {
            Self::OutlinePhase(p) => Some(p.phase),
            Self::ChapterPlan(c) => Some(c.chapter_num),
            _ => None,
        }
    }

    /// Whether this record carries no meaningful content.
    ///
    /// The persister overwrites an existing stored record without `force`
    /// only when the stored record is empty-equivalent.
    pub fn is_empty_equivalent(&self) -> bool {
        match self {
            Self::Character(c) => {
                c.identity.trim().is_empty()
                    && c.personality.trim().is_empty()
                    && c.motivation.trim().is_empty()
            }
            Self::OutlinePhase(p) => p.summary.trim().is_empty(),
            Self::WorldEntry(w) => w.content.trim().is_empty(),
            Self::ChapterPlan(c) => {
                let default_title = c.title.trim().is_empty()
                    || c.title == ChapterPlanRecord::default_title(c.chapter_num);
                c.summary.trim().is_empty() && default_title
            }
        }
    }

    /// Mutable references to every free-text field of this record.
    ///
    /// The consistency enforcer rewrites these in place when deterministic
    /// substitution is needed.
    pub fn text_fields_mut(&mut self) -> Vec<&mut String> {
        match self {
            Self::Character(c) => {
                vec![&mut c.identity, &mut c.personality, &mut c.motivation]
            }
            Self::OutlinePhase(p) => {
                let mut fields = vec![&mut p.label, &mut p.summary];
                if let Some(range) = p.word_range.as_mut() {
                    fields.push(range);
                }
                fields
            }
            Self::WorldEntry(w) => vec![&mut w.content],
            Self::ChapterPlan(c) => {
                let mut fields = vec![&mut c.title, &mut c.summary];
                if let Some(goal) = c.goal.as_mut() {
                    fields.push(goal);
                }
                fields
            }
        }
    }

    /// Read-only views of every free-text field of this record.
    pub fn text_fields(&self) -> Vec<&str> {
        match self {
            Self::Character(c) => {
                vec![c.identity.as_str(), c.personality.as_str(), c.motivation.as_str()]
            }
            Self::OutlinePhase(p) => {
                let mut fields = vec![p.label.as_str(), p.summary.as_str()];
                if let Some(range) = p.word_range.as_deref() {
                    fields.push(range);
                }
                fields
            }
            Self::WorldEntry(w) => vec![w.content.as_str()],
            Self::ChapterPlan(c) => {
                let mut fields = vec![c.title.as_str(), c.summary.as_str()];
                if let Some(goal) = c.goal.as_deref() {
                    fields.push(goal);
                }
                fields
            }
        }
    }

    /// Re-apply field clipping after a consistency rewrite.
    ///
    /// Substitution can lengthen a field; persistence requires every field
    /// to stay within its declared maximum.
    pub fn reclip(&mut self) {
        match self {
            Self::Character(c) => {
                c.identity = clip(&c.identity, 200);
                c.personality = clip(&c.personality, 260);
                c.motivation = clip(&c.motivation, 260);
            }
            Self::OutlinePhase(p) => {
                p.label = clip(&p.label, 40);
                p.summary = clip(&p.summary, 500);
            }
            Self::WorldEntry(w) => {
                w.content = clip(&w.content, 500);
            }
            Self::ChapterPlan(c) => {
                c.title = clip(&c.title, 60);
                c.summary = clip(&c.summary, 500);
                if let Some(goal) = c.goal.as_mut() {
                    *goal = clip(goal, 260);
                }
            }
        }
    }
}
