//! Trait definition for the relational-store collaborator.

use async_trait::async_trait;
use fabula_core::{EntityKind, IndexRange, NormalizedRecord};
use fabula_error::FabulaResult;

/// Facade over the relational store, scoped to one parent (e.g. one
/// project).
///
/// The persister is the only caller. Stores that support an
/// insert-or-do-nothing upsert on the (parent id, natural key) uniqueness
/// constraint report it via [`RecordStore::supports_insert_or_ignore`];
/// for stores that reject such a conflict clause the persister falls back
/// to an explicit look-before-insert guarded by [`RecordStore::existing_keys`].
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Whether the store accepts an insert-or-do-nothing conflict clause.
    fn supports_insert_or_ignore(&self) -> bool;

    /// Natural keys already present for this kind.
    async fn existing_keys(&self, kind: EntityKind) -> FabulaResult<Vec<String>>;

    /// Fetch the stored record under a natural key, if any.
    async fn fetch(&self, kind: EntityKind, key: &str) -> FabulaResult<Option<NormalizedRecord>>;

    /// Insert a record, doing nothing if the natural key already exists.
    ///
    /// Returns `true` if a row was inserted. Only available when
    /// [`RecordStore::supports_insert_or_ignore`] is `true`; other stores
    /// return a query error for an unrecognized conflict clause.
    async fn insert_if_absent(&self, record: &NormalizedRecord) -> FabulaResult<bool>;

    /// Insert a record unconditionally.
    ///
    /// Fails with a constraint violation if the natural key exists; used
    /// by the look-before-insert fallback after an existing-keys check.
    async fn insert(&self, record: &NormalizedRecord) -> FabulaResult<()>;

    /// Replace the record stored under the record's natural key.
    async fn replace(&self, record: &NormalizedRecord) -> FabulaResult<()>;

    /// Delete all records of a kind whose natural index lies in `range`.
    ///
    /// Non-indexed kinds delete the whole scope. Returns the number of
    /// rows removed.
    async fn delete_range(&self, kind: EntityKind, range: IndexRange) -> FabulaResult<usize>;
}
