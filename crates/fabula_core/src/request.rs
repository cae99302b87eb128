//! Request types for generation calls and range jobs.

use crate::{EntityKind, IndexRange};
use serde::{Deserialize, Serialize};

/// Sampling options forwarded to the generation driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GenerateOptions {
    /// Model identifier to use
    pub model: Option<String>,
    /// Sampling temperature (0.0 to 1.0)
    pub temperature: Option<f32>,
    /// Maximum number of tokens to generate
    pub max_tokens: Option<u32>,
}

impl GenerateOptions {
    /// Options for a formatting-repair round-trip: minimal randomness so
    /// the service fixes structure without rewriting content.
    pub fn minimal_randomness(&self) -> Self {
        Self {
            model: self.model.clone(),
            temperature: Some(0.0),
            max_tokens: self.max_tokens,
        }
    }
}

/// A driver-level text generation request.
///
/// The generation service is a black-box `text -> text` collaborator; the
/// request carries only a system preamble, a user prompt, and sampling
/// options.
///
/// # Examples
///
/// ```
/// use fabula_core::GenerateRequest;
///
/// let request = GenerateRequest::from_prompt("List three characters as JSON.");
/// assert!(request.system.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GenerateRequest {
    /// Optional system preamble
    pub system: Option<String>,
    /// The user prompt
    pub prompt: String,
    /// Sampling options
    pub options: GenerateOptions,
}

impl GenerateRequest {
    /// Create a request from a bare prompt with default options.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            options: GenerateOptions::default(),
        }
    }

    /// Builder method to set the system preamble.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Builder method to set the sampling options.
    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }
}

/// A driver-level generation response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// The generated text; no structural guarantee whatsoever
    pub text: String,
}

/// One batch-sized generation request, produced by the range planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Entity kind to generate
    pub kind: EntityKind,
    /// Sub-range this batch covers
    pub range: IndexRange,
}

/// A caller-level request to cover an index range with generated records.
///
/// # Examples
///
/// ```
/// use fabula_core::{EntityKind, IndexRange, RangeJobRequestBuilder};
///
/// let request = RangeJobRequestBuilder::default()
///     .kind(EntityKind::ChapterPlan)
///     .range(IndexRange::new(1, 45))
///     .batch_size(40u32)
///     .mandatory(true)
///     .build()
///     .unwrap();
///
/// assert!(request.mandatory());
/// assert!(!request.force());
/// ```
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, derive_builder::Builder, derive_getters::Getters,
)]
pub struct RangeJobRequest {
    /// Entity kind to generate
    kind: EntityKind,
    /// Inclusive index range to cover
    range: IndexRange,
    /// Maximum indices per generation call
    batch_size: u32,
    /// Whether a scope yielding zero viable records after full escalation
    /// is a hard failure rather than an acceptable degraded result
    #[builder(default)]
    mandatory: bool,
    /// Whether existing stored records in the range are deleted and
    /// regenerated instead of being preserved
    #[builder(default)]
    force: bool,
    /// Sampling options forwarded to the driver
    #[builder(default)]
    options: GenerateOptions,
    /// Outline structure preset ("three_act", "heros_journey", "custom",
    /// or empty for the default four-beat structure); consulted only for
    /// outline jobs
    #[builder(default)]
    structure: String,
    /// Custom phase list, split on common delimiters when `structure` is
    /// "custom"
    #[builder(default)]
    custom_phases: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let request = RangeJobRequestBuilder::default()
            .kind(EntityKind::Character)
            .range(IndexRange::new(1, 10))
            .batch_size(10u32)
            .build()
            .unwrap();
        assert!(!request.mandatory());
        assert!(!request.force());
        assert_eq!(request.options().temperature, None);
    }

    #[test]
    fn minimal_randomness_zeroes_temperature() {
        let options = GenerateOptions {
            model: Some("stub".to_string()),
            temperature: Some(0.8),
            max_tokens: Some(1200),
        };
        let repair = options.minimal_randomness();
        assert_eq!(repair.temperature, Some(0.0));
        assert_eq!(repair.model.as_deref(), Some("stub"));
    }
}
