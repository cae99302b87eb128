//! Shared types for the interface traits.

use serde::{Deserialize, Serialize};

/// A single fragment from a streaming generation response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Incremental text content
    pub text: String,
    /// Whether this is the final chunk
    pub is_final: bool,
}
