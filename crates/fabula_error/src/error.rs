//! Top-level error wrapper types.

use crate::{FormatError, GenerationError, PipelineError, StorageError};

/// Union of the error families raised across the Fabula workspace.
///
/// # Examples
///
/// ```
/// use fabula_error::{FabulaError, FormatError};
///
/// let format_err = FormatError::new("unbalanced brackets");
/// let err: FabulaError = format_err.into();
/// assert!(format!("{}", err).contains("Format Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum FabulaErrorKind {
    /// Generation-service error
    #[from(GenerationError)]
    Generation(GenerationError),
    /// Payload format error
    #[from(FormatError)]
    Format(FormatError),
    /// Storage error
    #[from(StorageError)]
    Storage(StorageError),
    /// Pipeline orchestration error
    #[from(PipelineError)]
    Pipeline(PipelineError),
}

/// Fabula error with kind discrimination.
///
/// # Examples
///
/// ```
/// use fabula_error::{FabulaResult, PipelineError, PipelineErrorKind};
///
/// fn might_fail() -> FabulaResult<()> {
///     Err(PipelineError::new(PipelineErrorKind::ZeroBatchSize))?
/// }
///
/// assert!(might_fail().is_err());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Fabula Error: {}", _0)]
pub struct FabulaError(Box<FabulaErrorKind>);

impl FabulaError {
    /// Create a new error from a kind.
    pub fn new(kind: FabulaErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &FabulaErrorKind {
        &self.0
    }

    /// Whether the underlying failure is timeout-classified.
    ///
    /// Used by the batch planner to decide between shrink-and-retry and
    /// abort-with-failed-range.
    pub fn is_timeout(&self) -> bool {
        match self.kind() {
            FabulaErrorKind::Generation(e) => e.is_timeout(),
            FabulaErrorKind::Storage(e) => {
                matches!(e.kind, crate::StorageErrorKind::Timeout(_))
            }
            _ => false,
        }
    }
}

// Generic From implementation for any type that converts to FabulaErrorKind
impl<T> From<T> for FabulaError
where
    T: Into<FabulaErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Fabula operations.
///
/// # Examples
///
/// ```
/// use fabula_error::{FabulaResult, GenerationError, GenerationErrorKind};
///
/// fn fetch() -> FabulaResult<String> {
///     Err(GenerationError::new(GenerationErrorKind::EmptyResponse))?
/// }
/// ```
pub type FabulaResult<T> = std::result::Result<T, FabulaError>;
