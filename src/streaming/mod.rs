//! Streaming utilities
//!
//! Upstream streams its answer as newline-delimited JSON; this module turns
//! the raw byte chunks back into discrete JSON values. SSE output helpers
//! for the client side live in [`sse`].

pub mod sse;

use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

/// Ordered, finite sequence of decoded upstream events
pub type EventStream = Pin<Box<dyn Stream<Item = Value> + Send>>;

/// Buffer for reassembling JSON lines split across chunk boundaries.
///
/// Bytes are kept raw until a full line is available, so a multi-byte
/// character cut in half by the network still decodes correctly.
///
/// # Example
/// ```
/// use puter_proxy::streaming::JsonLineDecoder;
///
/// let mut decoder = JsonLineDecoder::new();
///
/// assert!(decoder.feed(b"{\"text\":\"hel").is_empty());
/// let values = decoder.feed(b"lo\"}\n");
/// assert_eq!(values[0]["text"], "hello");
/// ```
#[derive(Debug, Default)]
pub struct JsonLineDecoder {
    incomplete: Vec<u8>,
    /// Prefix of `incomplete` already known to hold no newline
    scanned: usize,
}

impl JsonLineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes and return every value completed by them.
    ///
    /// Blank lines are skipped and lines that are not valid JSON are dropped.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Value> {
        self.incomplete.extend_from_slice(bytes);

        let mut values = Vec::new();
        let mut line_start = 0;
        while let Some(offset) = self.incomplete[self.scanned..]
            .iter()
            .position(|b| *b == b'\n')
        {
            let newline_pos = self.scanned + offset;
            if let Some(value) = parse_line(&self.incomplete[line_start..newline_pos]) {
                values.push(value);
            }
            line_start = newline_pos + 1;
            self.scanned = line_start;
        }

        self.incomplete.drain(..line_start);
        self.scanned = self.incomplete.len();
        values
    }

    /// Parse whatever is left once the body has ended.
    pub fn finish(self) -> Option<Value> {
        parse_line(&self.incomplete)
    }
}

fn parse_line(line: &[u8]) -> Option<Value> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return None;
    }

    match serde_json::from_slice(line) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(
                error = %e,
                line_len = line.len(),
                "Dropping unparseable stream line"
            );
            None
        }
    }
}

/// Decode an upstream body into its JSON events.
///
/// A transport error ends the sequence after everything decoded so far.
pub fn decode_json_lines<S, E>(body: S) -> EventStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut decoder = JsonLineDecoder::new();
        futures::pin_mut!(body);

        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    for value in decoder.feed(&bytes) {
                        yield value;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Upstream stream interrupted");
                    break;
                }
            }
        }

        if let Some(value) = decoder.finish() {
            yield value;
        }
    })
}
