//! In-memory record store.
//!
//! `MemoryStore` implements the [`RecordStore`] trait over a map keyed by
//! (kind, natural key). It serves tests and local runs, and can emulate a
//! relational store that rejects an insert-or-do-nothing conflict clause
//! so the persister's look-before-insert fallback stays exercised.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod memory;

pub use memory::MemoryStore;
