//! The generation-repair escalation ladder.
//!
//! A linear state machine with bounded steps:
//! `RawParse -> RepairViaService -> MinimalRegenerate -> DegradedEmpty`.
//! Formatting trouble never raises; the ladder always terminates with an
//! outcome, and the planner decides whether an empty outcome for a
//! mandatory scope is a hard failure.

use crate::prompts;
use fabula_core::{
    EntityKind, GenerateOptions, GenerateRequest, GenerationRequest, IndexRange, NormalizedRecord,
};
use fabula_error::FormatError;
use fabula_interface::GenerationDriver;
use fabula_parse::{normalize_payload, parse_payload};

/// Steps of the escalation ladder, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EscalationStep {
    /// Parse the raw response as-is
    RawParse,
    /// Re-send the malformed text with a fix-formatting-only instruction
    RepairViaService,
    /// Ask for a structurally-simpler regeneration
    MinimalRegenerate,
    /// Terminal: accept an empty record set and set the degraded flag
    DegradedEmpty,
}

/// Result of running the ladder for one batch.
#[derive(Debug, Clone)]
pub struct EscalationOutcome {
    /// Viable records recovered, possibly empty
    pub records: Vec<NormalizedRecord>,
    /// The step that produced the outcome
    pub step: EscalationStep,
    /// Whether the ladder exhausted its options and accepted emptiness
    pub degraded: bool,
    /// Parser diagnostics from the last failed attempt; observability only
    pub diagnostic: String,
}

/// Escalation ladder over a generation driver.
///
/// Makes at most two additional service calls per batch: one repair
/// round-trip and one minimal regeneration.
pub struct RepairEscalator<'a, D: GenerationDriver + ?Sized> {
    driver: &'a D,
}

impl<'a, D: GenerationDriver + ?Sized> RepairEscalator<'a, D> {
    /// Create an escalator over the given driver.
    pub fn new(driver: &'a D) -> Self {
        Self { driver }
    }

    fn try_parse(
        &self,
        kind: EntityKind,
        range: IndexRange,
        text: &str,
    ) -> (Vec<NormalizedRecord>, String) {
        let payload = parse_payload(kind, text);
        let records = match payload.value.as_ref() {
            Some(value) => {
                let range_filter = kind.is_indexed().then_some(range);
                normalize_payload(kind, value, range_filter)
            }
            None => Vec::new(),
        };
        (records, payload.diagnostic)
    }

    /// Run the ladder on one raw response.
    pub async fn run(
        &self,
        kind: EntityKind,
        range: IndexRange,
        raw: &str,
        options: &GenerateOptions,
    ) -> EscalationOutcome {
        // Step 1: parse the response as-is.
        let (records, diagnostic) = self.try_parse(kind, range, raw);
        if !records.is_empty() {
            return EscalationOutcome {
                records,
                step: EscalationStep::RawParse,
                degraded: false,
                diagnostic: String::new(),
            };
        }
        tracing::warn!(
            kind = %kind,
            range = %range,
            diagnostic = %diagnostic,
            "Raw parse yielded no records, escalating to service repair"
        );

        // Step 2: ask the service to fix its own formatting, minimal
        // randomness so content is preserved.
        let repair_request = GenerateRequest::from_prompt(prompts::repair_prompt(kind, raw))
            .with_options(options.minimal_randomness());
        let mut last_diagnostic = diagnostic;
        match self.driver.generate(&repair_request).await {
            Ok(response) => {
                let (records, diagnostic) = self.try_parse(kind, range, &response.text);
                if !records.is_empty() {
                    return EscalationOutcome {
                        records,
                        step: EscalationStep::RepairViaService,
                        degraded: false,
                        diagnostic: String::new(),
                    };
                }
                last_diagnostic = diagnostic;
            }
            Err(e) => {
                tracing::warn!(kind = %kind, error = %e, "Repair round-trip failed");
            }
        }

        // Step 3: structurally-simpler regeneration, validity over richness.
        let minimal_request =
            GenerateRequest::from_prompt(prompts::minimal_prompt(GenerationRequest { kind, range }))
                .with_options(options.minimal_randomness());
        match self.driver.generate(&minimal_request).await {
            Ok(response) => {
                let (records, diagnostic) = self.try_parse(kind, range, &response.text);
                if !records.is_empty() {
                    return EscalationOutcome {
                        records,
                        step: EscalationStep::MinimalRegenerate,
                        degraded: false,
                        diagnostic: String::new(),
                    };
                }
                last_diagnostic = diagnostic;
            }
            Err(e) => {
                tracing::warn!(kind = %kind, error = %e, "Minimal regeneration failed");
            }
        }

        // Terminal: degrade to empty. The format failure is absorbed here,
        // never raised; it surfaces only as the degraded flag and this log.
        tracing::warn!(
            kind = %kind,
            range = %range,
            error = %FormatError::new(&last_diagnostic),
            "Escalation exhausted, degrading to empty record set"
        );
        EscalationOutcome {
            records: Vec::new(),
            step: EscalationStep::DegradedEmpty,
            degraded: true,
            diagnostic: last_diagnostic,
        }
    }
}
