//! Sequential range-batch planning and orchestration.
//!
//! The planner covers `[start, end]` in steps of at most `batch_size`,
//! strictly in order: later batches consume continuity context produced by
//! earlier ones, so there is no parallelism. A timeout-classified failure
//! retries the same start at a smaller size from a fixed descending
//! candidate list; any other service failure aborts the job and reports
//! the first unprocessed sub-range as `failed_range`.

use crate::{ConsistencyEnforcer, IdempotentPersister, RepairEscalator, prompts};
use fabula_core::{
    BatchResult, EntityKind, GenerateRequest, GenerateResponse, GenerationRequest, IndexRange,
    RangeJobRequest, RangeJobSummary,
};
use fabula_error::{
    FabulaResult, GenerationError, GenerationErrorKind, PipelineError, PipelineErrorKind,
};
use fabula_interface::{GenerationDriver, RecordStore};
use std::time::Duration;

/// Fixed descending batch sizes tried after a timeout. Exhausting the
/// list surfaces as `failed_range` rather than looping indefinitely.
const SHRINK_CANDIDATES: [u32; 5] = [40, 30, 20, 10, 5];

fn next_smaller(size: u32) -> Option<u32> {
    SHRINK_CANDIDATES.into_iter().find(|&c| c < size)
}

/// Sequential range-batch planner.
///
/// Owns the cursor and accumulated counters for the life of one range
/// job; one planner instance serves one job at a time.
pub struct RangeBatchPlanner<'a, D: GenerationDriver + ?Sized, S: RecordStore + ?Sized> {
    driver: &'a D,
    store: &'a S,
    enforcer: Option<ConsistencyEnforcer>,
    call_timeout: Option<Duration>,
}

impl<'a, D: GenerationDriver + ?Sized, S: RecordStore + ?Sized> RangeBatchPlanner<'a, D, S> {
    /// Create a planner over a driver and a store.
    pub fn new(driver: &'a D, store: &'a S) -> Self {
        Self {
            driver,
            store,
            enforcer: None,
            call_timeout: None,
        }
    }

    /// Attach a consistency enforcer, run between normalization and
    /// persistence.
    pub fn with_enforcer(mut self, enforcer: ConsistencyEnforcer) -> Self {
        self.enforcer = Some(enforcer);
        self
    }

    /// Budget each generation call; elapsed budget is classified as a
    /// timeout and triggers batch-size shrinkage.
    pub fn with_call_timeout(mut self, budget: Duration) -> Self {
        self.call_timeout = Some(budget);
        self
    }

    async fn call_driver(&self, req: &GenerateRequest) -> FabulaResult<GenerateResponse> {
        match self.call_timeout {
            Some(budget) => match tokio::time::timeout(budget, self.driver.generate(req)).await {
                Ok(result) => result,
                Err(_) => Err(GenerationError::new(GenerationErrorKind::Timeout(format!(
                    "generation call exceeded {budget:?}"
                ))))?,
            },
            None => self.driver.generate(req).await,
        }
    }

    /// Run a full range job and return its summary.
    ///
    /// # Errors
    ///
    /// Returns an error only for hard failures: an invalid request, a
    /// mandatory scope with zero viable records after full escalation, or
    /// a non-conflict storage failure. Timeouts and format trouble are
    /// absorbed into the summary.
    pub async fn run(&self, request: &RangeJobRequest) -> FabulaResult<RangeJobSummary> {
        let range = *request.range();
        let kind = *request.kind();
        if range.is_empty() {
            return Err(PipelineError::new(PipelineErrorKind::InvalidRange {
                start: range.start,
                end: range.end,
            })
            .into());
        }
        if *request.batch_size() == 0 {
            return Err(PipelineError::new(PipelineErrorKind::ZeroBatchSize).into());
        }

        tracing::info!(
            kind = %kind,
            range = %range,
            batch_size = request.batch_size(),
            mandatory = request.mandatory(),
            force = request.force(),
            "Starting range job"
        );

        let mut summary = RangeJobSummary {
            effective_range: Some(range),
            planned_batches: range.len().div_ceil(*request.batch_size()) as usize,
            ..RangeJobSummary::default()
        };

        let escalator = RepairEscalator::new(self.driver);
        let persister = IdempotentPersister::new(self.store);
        let outline_labels = match kind {
            EntityKind::OutlinePhase => {
                prompts::phase_labels(request.structure(), request.custom_phases())
            }
            _ => Vec::new(),
        };
        let mut size = *request.batch_size();
        let mut current = range.start;

        'job: while current <= range.end {
            let mut batch_retries = 0u32;
            let (batch_range, text) = loop {
                let batch = GenerationRequest {
                    kind,
                    range: IndexRange::new(
                        current,
                        current.saturating_add(size - 1).min(range.end),
                    ),
                };
                let batch_range = batch.range;
                let prompt = if outline_labels.is_empty() {
                    prompts::batch_prompt(batch)
                } else {
                    prompts::outline_prompt(batch, &outline_labels)
                };
                let generate =
                    GenerateRequest::from_prompt(prompt).with_options(request.options().clone());
                match self.call_driver(&generate).await {
                    Ok(response) => break (batch_range, response.text),
                    Err(e) if e.is_timeout() => match next_smaller(size) {
                        Some(smaller) => {
                            tracing::warn!(
                                range = %batch_range,
                                from = size,
                                to = smaller,
                                "Timeout, retrying at smaller batch size"
                            );
                            batch_retries += 1;
                            size = smaller;
                        }
                        None => {
                            tracing::error!(
                                range = %batch_range,
                                "Batch-size candidates exhausted, aborting job"
                            );
                            summary.retry_count += batch_retries;
                            summary.failed_range = Some(IndexRange::new(current, range.end));
                            break 'job;
                        }
                    },
                    Err(e) => {
                        tracing::error!(range = %batch_range, error = %e, "Generation failed, aborting job");
                        summary.retry_count += batch_retries;
                        summary.failed_range = Some(IndexRange::new(current, range.end));
                        break 'job;
                    }
                }
            };

            let escalated = escalator
                .run(kind, batch_range, &text, request.options())
                .await;
            if escalated.records.is_empty() && *request.mandatory() {
                return Err(PipelineError::new(PipelineErrorKind::MandatoryScopeEmpty(
                    kind.to_string(),
                ))
                .into());
            }

            let records = match &self.enforcer {
                Some(enforcer) => {
                    enforcer
                        .enforce(
                            self.driver,
                            kind,
                            batch_range,
                            escalated.records,
                            request.options(),
                        )
                        .await
                }
                None => escalated.records,
            };

            // Named kinds clear their whole scope on force; only do that
            // for the first batch so later batches don't clobber earlier ones.
            let batch_force =
                *request.force() && (kind.is_indexed() || current == range.start);
            let persisted = persister
                .persist(kind, batch_range, &records, batch_force)
                .await?;

            summary.absorb(
                kind,
                BatchResult {
                    range: batch_range,
                    inserted: persisted.inserted,
                    skipped: persisted.skipped,
                    degraded: escalated.degraded,
                    retries: batch_retries,
                },
            );
            match batch_range.end.checked_add(1) {
                Some(next) => current = next,
                // Batch ended at the index ceiling; the range is covered.
                None => break,
            }
        }

        summary.planned_batches = summary.planned_batches.max(summary.success_batches);
        tracing::info!(
            kind = %kind,
            batches = summary.success_batches,
            inserted = summary.total_inserted(),
            retries = summary.retry_count,
            degraded = summary.degraded,
            failed = ?summary.failed_range,
            "Range job finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shrink_ladder_descends() {
        assert_eq!(next_smaller(40), Some(30));
        assert_eq!(next_smaller(25), Some(20));
        assert_eq!(next_smaller(10), Some(5));
        assert_eq!(next_smaller(5), None);
        assert_eq!(next_smaller(3), None);
    }
}
