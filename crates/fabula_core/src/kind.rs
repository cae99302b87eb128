//! Entity kinds produced by the planning pipeline.

use serde::{Deserialize, Serialize};

/// The four structured planning categories the pipeline produces.
///
/// # Examples
///
/// ```
/// use fabula_core::EntityKind;
/// use std::str::FromStr;
///
/// assert_eq!(EntityKind::from_str("characters").unwrap(), EntityKind::Character);
/// assert_eq!(EntityKind::ChapterPlan.to_string(), "chapters");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Character roster entries
    #[strum(serialize = "characters")]
    Character,
    /// Outline phases of the overall story structure
    #[strum(serialize = "outline")]
    OutlinePhase,
    /// Worldbuilding entries (factions, locations, rules, ...)
    #[strum(serialize = "world")]
    WorldEntry,
    /// Per-chapter plans over the chapter index space
    #[strum(serialize = "chapters")]
    ChapterPlan,
}

impl EntityKind {
    /// Whether this kind is indexed over a caller-supplied range.
    ///
    /// Chapter plans and outline phases carry a natural ordinal index;
    /// characters and world entries are keyed by name/title instead.
    pub fn is_indexed(&self) -> bool {
        matches!(self, Self::ChapterPlan | Self::OutlinePhase)
    }

    /// Whether a bare top-level array is an acceptable payload root for
    /// this kind, in addition to a wrapping object.
    pub fn accepts_array_root(&self) -> bool {
        matches!(self, Self::Character | Self::WorldEntry)
    }
}
