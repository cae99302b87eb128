//! Idempotent persistence of normalized records.
//!
//! Records are keyed by natural index. Without `force`, a stored record is
//! only overwritten when it is empty-equivalent; everything else is
//! skipped and counted. Inserts prefer the store's insert-or-do-nothing
//! upsert and fall back to look-before-insert where the conflict clause
//! is unsupported.

use fabula_core::{EntityKind, IndexRange, NormalizedRecord};
use fabula_error::{FabulaError, FabulaErrorKind, FabulaResult, StorageErrorKind};
use fabula_interface::RecordStore;
use std::collections::BTreeSet;

/// Insert/skip accounting for one persistence call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PersistOutcome {
    /// Records newly inserted or legitimately overwritten
    pub inserted: usize,
    /// Records skipped because a stronger stored record already existed
    pub skipped: usize,
}

/// Whether an error is the natural-key uniqueness constraint firing,
/// i.e. a lost race rather than a hard failure.
fn is_natural_key_conflict(error: &FabulaError) -> bool {
    matches!(
        error.kind(),
        FabulaErrorKind::Storage(e)
            if matches!(&e.kind, StorageErrorKind::ConstraintViolation(msg)
                if msg.contains("natural key"))
    )
}

/// Idempotent persister over a record store.
pub struct IdempotentPersister<'a, S: RecordStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: RecordStore + ?Sized> IdempotentPersister<'a, S> {
    /// Create a persister over the given store.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Persist a batch of records for `kind` covering `range`.
    ///
    /// With `force`, the target range is deleted first and everything is
    /// inserted fresh. Without it, existing keys are preserved unless the
    /// stored record is empty-equivalent.
    ///
    /// # Errors
    ///
    /// Propagates non-conflict storage failures; the uniqueness constraint
    /// firing on a concurrent insert is absorbed as a skip.
    pub async fn persist(
        &self,
        kind: EntityKind,
        range: IndexRange,
        records: &[NormalizedRecord],
        force: bool,
    ) -> FabulaResult<PersistOutcome> {
        let mut outcome = PersistOutcome::default();
        if records.is_empty() {
            return Ok(outcome);
        }

        if force {
            let removed = self.store.delete_range(kind, range).await?;
            tracing::info!(kind = %kind, range = %range, removed, "Force: cleared target range");
        }

        let existing: BTreeSet<String> = self.store.existing_keys(kind).await?.into_iter().collect();

        for record in records {
            let key = record.natural_key();
            if existing.contains(&key) {
                let stored = self.store.fetch(kind, &key).await?;
                let weak = stored.map(|s| s.is_empty_equivalent()).unwrap_or(true);
                if weak {
                    self.store.replace(record).await?;
                    outcome.inserted += 1;
                } else {
                    tracing::debug!(kind = %kind, key = %key, "Skipping: stored record is stronger");
                    outcome.skipped += 1;
                }
                continue;
            }

            if self.store.supports_insert_or_ignore() {
                if self.store.insert_if_absent(record).await? {
                    outcome.inserted += 1;
                } else {
                    outcome.skipped += 1;
                }
            } else {
                // Look-before-insert fallback: guarded by the same
                // existing-keys check used for updates above.
                match self.store.insert(record).await {
                    Ok(()) => outcome.inserted += 1,
                    Err(e) if is_natural_key_conflict(&e) => outcome.skipped += 1,
                    Err(e) => return Err(e),
                }
            }
        }

        tracing::info!(
            kind = %kind,
            range = %range,
            inserted = outcome.inserted,
            skipped = outcome.skipped,
            "Persisted batch"
        );
        Ok(outcome)
    }
}
