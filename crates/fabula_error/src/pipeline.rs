//! Pipeline error types.

/// Specific hard-failure conditions for range-job orchestration.
///
/// Everything recoverable (format trouble, timeouts) is absorbed into
/// batch state; these kinds are the conditions that abort a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum PipelineErrorKind {
    /// A mandatory scope produced zero viable records after full escalation
    #[display("Mandatory scope '{}' yielded no viable records after escalation", _0)]
    MandatoryScopeEmpty(String),
    /// The requested range is empty or inverted
    #[display("Invalid range [{}, {}]", start, end)]
    InvalidRange {
        /// Requested start index
        start: u32,
        /// Requested end index
        end: u32,
    },
    /// Requested batch size is zero
    #[display("Batch size must be at least 1")]
    ZeroBatchSize,
    /// A non-conflict storage constraint violation surfaced during persistence
    #[display("Persistence failed: {}", _0)]
    PersistenceFailed(String),
}

/// Pipeline error with location tracking.
///
/// # Examples
///
/// ```
/// use fabula_error::{PipelineError, PipelineErrorKind};
///
/// let err = PipelineError::new(PipelineErrorKind::MandatoryScopeEmpty(
///     "characters".to_string(),
/// ));
/// assert!(format!("{}", err).contains("characters"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Pipeline Error: {} at line {} in {}", kind, line, file)]
pub struct PipelineError {
    /// The specific error condition
    pub kind: PipelineErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl PipelineError {
    /// Create a new PipelineError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: PipelineErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
