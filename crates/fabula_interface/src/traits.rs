//! Trait definitions for the generation service collaborator.

use crate::StreamChunk;
use async_trait::async_trait;
use fabula_core::{GenerateRequest, GenerateResponse};
use fabula_error::FabulaResult;
use futures_util::stream::Stream;
use std::pin::Pin;

/// Core trait for the black-box generation service.
///
/// Implementations make no structural promise about the response text: it
/// may be fenced, truncated, wrongly quoted, or plain prose. The parsing
/// layer owns recovery.
#[async_trait]
pub trait GenerationDriver: Send + Sync {
    /// Generate text for the given request.
    async fn generate(&self, req: &GenerateRequest) -> FabulaResult<GenerateResponse>;

    /// Provider name for logging (e.g. "gemini", "stub").
    fn provider_name(&self) -> &'static str;
}

/// Trait for drivers that support streaming responses.
#[async_trait]
pub trait Streaming: GenerationDriver {
    /// Generate a streaming response.
    ///
    /// Returns a stream yielding text fragments as they arrive.
    async fn generate_stream(
        &self,
        req: &GenerateRequest,
    ) -> FabulaResult<Pin<Box<dyn Stream<Item = FabulaResult<StreamChunk>> + Send>>>;
}
