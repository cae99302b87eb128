//! Error types for the Fabula planning pipeline.
//!
//! This crate provides the foundation error types used throughout the Fabula
//! workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! Recoverable conditions (unparsable payloads, generation timeouts) are
//! absorbed by the component that detects them and surfaced as state on
//! batch results; only hard failures cross crate boundaries as `Err`.
//!
//! # Examples
//!
//! ```
//! use fabula_error::{FabulaResult, GenerationError, GenerationErrorKind};
//!
//! fn call_service() -> FabulaResult<String> {
//!     Err(GenerationError::new(GenerationErrorKind::ServiceUnavailable(
//!         "connection refused".to_string(),
//!     )))?
//! }
//!
//! match call_service() {
//!     Ok(text) => println!("Got: {}", text),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod format;
mod generation;
mod pipeline;
mod storage;

pub use error::{FabulaError, FabulaErrorKind, FabulaResult};
pub use format::FormatError;
pub use generation::{GenerationError, GenerationErrorKind};
pub use pipeline::{PipelineError, PipelineErrorKind};
pub use storage::{StorageError, StorageErrorKind};
