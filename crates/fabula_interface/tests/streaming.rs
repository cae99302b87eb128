//! Streaming driver contract: chunks arrive in order and the final chunk
//! is flagged.

use async_trait::async_trait;
use fabula_core::{GenerateRequest, GenerateResponse};
use fabula_error::FabulaResult;
use fabula_interface::{GenerationDriver, StreamChunk, Streaming};
use futures_util::StreamExt;
use std::pin::Pin;

struct ChunkedStub {
    chunks: Vec<&'static str>,
}

#[async_trait]
impl GenerationDriver for ChunkedStub {
    async fn generate(&self, _req: &GenerateRequest) -> FabulaResult<GenerateResponse> {
        Ok(GenerateResponse {
            text: self.chunks.concat(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "chunked-stub"
    }
}

#[async_trait]
impl Streaming for ChunkedStub {
    async fn generate_stream(
        &self,
        _req: &GenerateRequest,
    ) -> FabulaResult<Pin<Box<dyn futures_util::Stream<Item = FabulaResult<StreamChunk>> + Send>>>
    {
        let chunks = self.chunks.clone();
        let stream = async_stream::stream! {
            let last = chunks.len().saturating_sub(1);
            for (i, text) in chunks.into_iter().enumerate() {
                yield Ok(StreamChunk {
                    text: text.to_string(),
                    is_final: i == last,
                });
            }
        };
        Ok(Box::pin(stream))
    }
}

#[tokio::test]
async fn chunks_concatenate_to_the_full_response() {
    let stub = ChunkedStub {
        chunks: vec!["{\"chapters\": ", "[{\"chapter_num\": 1,", " \"title\": \"A\"}]}"],
    };
    let req = GenerateRequest::from_prompt("stream it");

    let mut stream = stub.generate_stream(&req).await.unwrap();
    let mut assembled = String::new();
    let mut finals = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.unwrap();
        assembled.push_str(&chunk.text);
        if chunk.is_final {
            finals += 1;
        }
    }

    assert_eq!(finals, 1);
    assert_eq!(assembled, stub.generate(&req).await.unwrap().text);
}
