//! Range-batch orchestration for the Fabula planning pipeline.
//!
//! This crate drives many generation rounds across a large ordered index
//! space (e.g. chapters 1..N of a book) and turns untrusted service output
//! into committed records:
//!
//! - [`RepairEscalator`] — bounded escalation ladder from raw parsing to a
//!   degraded-empty result
//! - [`RangeBatchPlanner`] — sequential cursor with shrinking-batch retry
//!   on timeouts and abort-with-`failed_range` on hard service failures
//! - [`ConsistencyEnforcer`] — cross-batch premature-mention and stale
//!   range/volume label checks
//! - [`IdempotentPersister`] — upserts that never silently clobber
//!   existing good content
//!
//! # Example
//!
//! ```no_run
//! use fabula_core::{EntityKind, IndexRange, RangeJobRequestBuilder};
//! use fabula_pipeline::RangeBatchPlanner;
//! use fabula_storage::MemoryStore;
//! # use fabula_interface::GenerationDriver;
//! # async fn example(driver: &dyn GenerationDriver) -> fabula_error::FabulaResult<()> {
//! let store = MemoryStore::new();
//! let request = RangeJobRequestBuilder::default()
//!     .kind(EntityKind::ChapterPlan)
//!     .range(IndexRange::new(1, 45))
//!     .batch_size(40u32)
//!     .build()
//!     .unwrap();
//!
//! let planner = RangeBatchPlanner::new(driver, &store);
//! let summary = planner.run(&request).await?;
//! println!("inserted {} records", summary.total_inserted());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod consistency;
mod escalate;
mod persist;
mod planner;
mod prompts;

pub use consistency::{ConsistencyEnforcer, Violation};
pub use escalate::{EscalationOutcome, EscalationStep, RepairEscalator};
pub use persist::{IdempotentPersister, PersistOutcome};
pub use planner::RangeBatchPlanner;
pub use prompts::phase_labels;
