//! Payload format error types.

/// Format error raised when generated text cannot be decoded into the
/// expected structure.
///
/// These never cross component boundaries; the repair escalator absorbs
/// them and records the outcome on the batch result instead.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Format Error: {} at line {} in {}", message, line, file)]
pub struct FormatError {
    /// Description of what failed to decode
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl FormatError {
    /// Create a new FormatError with the given message at the current location.
    ///
    /// # Examples
    ///
    /// ```
    /// use fabula_error::FormatError;
    ///
    /// let err = FormatError::new("no balanced object found");
    /// assert!(err.message.contains("balanced"));
    /// ```
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }
}
