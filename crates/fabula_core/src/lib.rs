//! Core data model for the Fabula planning pipeline.
//!
//! This crate defines the types shared across the workspace:
//!
//! - **Entity kinds**: the four structured planning categories the pipeline
//!   produces (characters, outline phases, world entries, chapter plans)
//! - **Records**: validated, length-bounded planning records
//! - **Requests**: driver-level generation requests and caller-level range
//!   job requests
//! - **Reports**: per-batch results and the aggregated range job summary
//!
//! # Example
//!
//! ```
//! use fabula_core::{EntityKind, IndexRange, RangeJobRequestBuilder};
//!
//! let request = RangeJobRequestBuilder::default()
//!     .kind(EntityKind::ChapterPlan)
//!     .range(IndexRange::new(1, 45))
//!     .batch_size(40u32)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(request.range().len(), 45);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod kind;
mod record;
mod report;
mod request;
mod text;

pub use kind::EntityKind;
pub use record::{
    CharacterRecord, CharacterRole, ChapterPlanRecord, NormalizedRecord, OutlinePhaseRecord,
    WorldCategory, WorldEntryRecord,
};
pub use report::{BatchResult, IndexRange, RangeJobSummary};
pub use request::{
    GenerateOptions, GenerateRequest, GenerateResponse, GenerationRequest, RangeJobRequest,
    RangeJobRequestBuilder,
};
pub use text::{clip, is_placeholder_name, squash_key};
