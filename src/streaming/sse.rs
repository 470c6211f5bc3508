//! SSE framing for client-bound completion chunks

use bytes::Bytes;

use crate::chat::StreamChunk;

/// Format a stream chunk as `data: {json}\n\n`.
pub fn format_sse_chunk(chunk: &StreamChunk) -> Bytes {
    let json = serde_json::to_string(chunk).expect("StreamChunk should always serialize");
    Bytes::from(format!("data: {}\n\n", json))
}

/// The OpenAI stream terminator, `data: [DONE]\n\n`
pub fn format_sse_done() -> Bytes {
    Bytes::from_static(b"data: [DONE]\n\n")
}
