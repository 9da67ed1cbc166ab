//! Streaming events emitted by LLM backends.

/// Events emitted while streaming a model response.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A chunk of response text.
    TextDelta(String),

    /// Token usage information.
    Usage {
        input_tokens: u32,
        output_tokens: u32,
    },

    /// Stream has completed successfully.
    Done,

    /// An error occurred during streaming. Terminal: no further events follow.
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_delta_holds_chunk() {
        let event = StreamEvent::TextDelta("[LOG]make[/LOG]".to_string());
        match event {
            StreamEvent::TextDelta(text) => assert_eq!(text, "[LOG]make[/LOG]"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn usage_fields() {
        let event = StreamEvent::Usage {
            input_tokens: 1200,
            output_tokens: 340,
        };
        assert_eq!(
            event,
            StreamEvent::Usage {
                input_tokens: 1200,
                output_tokens: 340
            }
        );
    }
}
