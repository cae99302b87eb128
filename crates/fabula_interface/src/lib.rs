//! Trait seams between the Fabula pipeline and its external collaborators.
//!
//! Two collaborators live outside the pipeline: the generation service
//! (a black-box `text -> text` function with no structural guarantee) and
//! the relational store. This crate defines the traits the pipeline
//! programs against, so both can be swapped for stubs in tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod store;
mod traits;
mod types;

pub use store::RecordStore;
pub use traits::{GenerationDriver, Streaming};
pub use types::StreamChunk;
