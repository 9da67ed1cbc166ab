//! Server-Sent Events stream decoding.
//!
//! The Gemini streaming endpoint (`?alt=sse`) delivers one JSON payload per
//! SSE event. Chunk boundaries from the HTTP body are arbitrary, so the
//! decoder buffers a partial line until its newline arrives.

use async_stream::stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};

/// A decoded SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the `event:` field, if any.
    pub event_type: Option<String>,
    /// Joined value of the `data:` field(s).
    pub data: String,
}

/// Incremental SSE decoder fed with raw byte chunks.
#[derive(Debug, Default)]
pub struct SseDecoder {
    line_buf: String,
    event_type: Option<String>,
    data_lines: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of bytes, returning every event it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let mut events = Vec::new();
        for c in String::from_utf8_lossy(chunk).chars() {
            if c == '\n' {
                let line = std::mem::take(&mut self.line_buf);
                if let Some(event) = self.accept_line(line.strip_suffix('\r').unwrap_or(&line)) {
                    events.push(event);
                }
            } else {
                self.line_buf.push(c);
            }
        }
        events
    }

    /// End of stream: dispatch whatever is still buffered.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.line_buf.is_empty() {
            let line = std::mem::take(&mut self.line_buf);
            if let Some(event) = self.accept_line(line.strip_suffix('\r').unwrap_or(&line)) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    /// Process one complete line. A blank line terminates the pending event.
    fn accept_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }

        let Some(colon) = line.find(':') else {
            // Field name without a value, or garbage; ignored.
            return None;
        };
        let field = &line[..colon];
        let value = line[colon + 1..].strip_prefix(' ').unwrap_or(&line[colon + 1..]);

        match field {
            "event" => self.event_type = Some(value.to_string()),
            "data" => self.data_lines.push(value.to_string()),
            // id, retry, and comment lines (empty field) are not needed here
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.data_lines.is_empty() {
            self.event_type = None;
            return None;
        }
        Some(SseEvent {
            event_type: self.event_type.take(),
            data: std::mem::take(&mut self.data_lines).join("\n"),
        })
    }
}

/// Decode a fallible byte stream into SSE events.
///
/// A transport error is yielded once and terminates the stream.
pub fn decode_sse<S, E>(input: S) -> impl Stream<Item = Result<SseEvent, E>>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    stream! {
        let mut decoder = SseDecoder::new();
        let mut input = Box::pin(input);

        while let Some(item) = input.next().await {
            match item {
                Ok(bytes) => {
                    for event in decoder.feed(&bytes) {
                        yield Ok(event);
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }

        if let Some(event) = decoder.finish() {
            yield Ok(event);
        }
    }
}
