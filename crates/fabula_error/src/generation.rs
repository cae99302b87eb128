//! Generation-service error types.

/// Substrings that classify a generation failure as a timeout.
///
/// Error text from the service carries no structured code, so timeouts are
/// recognized by matching these fragments case-insensitively.
const TIMEOUT_MARKERS: [&str; 3] = ["timeout", "deadline exceeded", "timed out"];

/// Kinds of generation-service errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum GenerationErrorKind {
    /// The call exceeded its time budget
    #[display("Generation timed out: {}", _0)]
    Timeout(String),
    /// The service rejected or failed the request
    #[display("Generation service unavailable: {}", _0)]
    ServiceUnavailable(String),
    /// The service returned an empty response body
    #[display("Generation returned an empty response")]
    EmptyResponse,
}

impl GenerationErrorKind {
    /// Classify a raw error message, mapping timeout-shaped text to
    /// [`GenerationErrorKind::Timeout`].
    ///
    /// # Examples
    ///
    /// ```
    /// use fabula_error::GenerationErrorKind;
    ///
    /// let kind = GenerationErrorKind::classify("request timed out after 30s");
    /// assert!(matches!(kind, GenerationErrorKind::Timeout(_)));
    ///
    /// let kind = GenerationErrorKind::classify("503 service overloaded");
    /// assert!(matches!(kind, GenerationErrorKind::ServiceUnavailable(_)));
    /// ```
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if TIMEOUT_MARKERS.iter().any(|m| lower.contains(m)) {
            Self::Timeout(message)
        } else {
            Self::ServiceUnavailable(message)
        }
    }

    /// Whether this kind represents a timeout-classified failure.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Generation-service error with location tracking.
///
/// # Examples
///
/// ```
/// use fabula_error::{GenerationError, GenerationErrorKind};
///
/// let err = GenerationError::new(GenerationErrorKind::classify("deadline exceeded"));
/// assert!(err.kind.is_timeout());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Generation Error: {} at line {} in {}", kind, line, file)]
pub struct GenerationError {
    /// The kind of error that occurred
    pub kind: GenerationErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl GenerationError {
    /// Create a new generation error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GenerationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Whether this error represents a timeout-classified failure.
    pub fn is_timeout(&self) -> bool {
        self.kind.is_timeout()
    }
}
