//! Mock backend for testing.
//!
//! Produces the exact same `StreamEvent` sequence as the real Gemini adapter,
//! so every layer above the backend can be tested without HTTP.

use std::time::Duration;

use async_stream::stream;
use futures::Stream;
use tokio::time::sleep;

use ba_protocol::StreamEvent;

/// One scripted item in a mock stream.
#[derive(Debug, Clone)]
pub enum MockChunk {
    /// Emit a text delta.
    Text(String),
    /// Emit usage information.
    Usage {
        input_tokens: u32,
        output_tokens: u32,
    },
    /// Emit a terminal error (the stream ends without `Done`).
    Error(String),
    /// Pause without emitting (for timing tests).
    Delay { ms: u64 },
}

/// A scripted sequence of chunks to stream.
#[derive(Debug, Clone, Default)]
pub struct MockScript {
    pub chunks: Vec<MockChunk>,
}

impl MockScript {
    pub fn new(chunks: Vec<MockChunk>) -> Self {
        Self { chunks }
    }

    /// Script that streams the given text fragments as-is.
    pub fn text(fragments: &[&str]) -> Self {
        Self::new(
            fragments
                .iter()
                .map(|f| MockChunk::Text((*f).to_string()))
                .collect(),
        )
    }

    /// Turn the script into a stream of events, terminated by `Done` unless
    /// an `Error` chunk cuts it short.
    pub fn into_stream(self) -> impl Stream<Item = StreamEvent> + Send + 'static {
        stream! {
            for chunk in self.chunks {
                match chunk {
                    MockChunk::Text(content) => yield StreamEvent::TextDelta(content),
                    MockChunk::Usage { input_tokens, output_tokens } => {
                        yield StreamEvent::Usage { input_tokens, output_tokens };
                    }
                    MockChunk::Error(message) => {
                        yield StreamEvent::Error(message);
                        return;
                    }
                    MockChunk::Delay { ms } => sleep(Duration::from_millis(ms)).await,
                }
            }
            yield StreamEvent::Done;
        }
    }
}

/// Canned scripts for common scenarios.
pub mod fixtures {
    use super::*;

    /// A raw script-execution log, one line per chunk.
    pub fn script_run(lines: &[&str]) -> MockScript {
        MockScript::new(
            lines
                .iter()
                .map(|line| MockChunk::Text(format!("{line}\n")))
                .collect(),
        )
    }

    /// A stream that fails partway through.
    pub fn error_mid_stream(text_before: &str, error: &str) -> MockScript {
        MockScript::new(vec![
            MockChunk::Text(text_before.to_string()),
            MockChunk::Error(error.to_string()),
        ])
    }

    /// A full build simulation: initial logs, a failure, analysis, a fix for
    /// `fix_path`, a successful retry, and the success token. Markers are
    /// deliberately split across chunk boundaries to exercise buffering.
    pub fn build_with_fix(fix_path: &str, fixed_content: &str) -> MockScript {
        MockScript::new(vec![
            MockChunk::Text("[LOG]make -C buildroot".to_string()),
            MockChunk::Text(" O=output -j8[/LO".to_string()),
            MockChunk::Text("G][ERR".to_string()),
            MockChunk::Text(
                "OR]drivers/char/virtio_console.c: undefined symbol[/ERROR]".to_string(),
            ),
            MockChunk::Text(
                "[ANALYSIS]The kernel fragment is missing CONFIG_VIRTIO_CONSOLE=y.[/ANALYSIS]"
                    .to_string(),
            ),
            MockChunk::Text(format!("[FIX:{fix_path}]\n{fixed_content}\n[/FI")),
            MockChunk::Text("X][LOG]make: build finished[/LOG]".to_string()),
            MockChunk::Text("[SUCC".to_string()),
            MockChunk::Text("ESS]".to_string()),
            MockChunk::Usage {
                input_tokens: 2048,
                output_tokens: 512,
            },
        ])
    }
}
