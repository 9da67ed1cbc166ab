//! Streaming control-marker parser for build simulation output.
//!
//! The build prompt instructs the model to wrap its output in control
//! markers: `[LOG]...[/LOG]`, `[ERROR]...[/ERROR]`, `[ANALYSIS]...[/ANALYSIS]`,
//! `[FIX:path]...[/FIX]`, and a bare `[SUCCESS]`. Stream chunk boundaries are
//! arbitrary and may land in the middle of a marker, so the parser appends
//! each chunk to a buffer holding the unconsumed suffix of everything
//! received, then re-scans until no further marker completes.
//!
//! Each scan consumes the earliest complete marker in the buffer (probe
//! priority: fix-open, fix-close, block-open, matching block-close, success),
//! so the emitted event sequence does not depend on where the chunk
//! boundaries fall. A close tag of a kind other than the active one is not
//! treated as a marker; it stays literal inside the block content.
//! Unterminated blocks are never an error: whatever is left in the buffer at
//! end of stream is flushed as one final log event.

const FIX_OPEN: &str = "[FIX:";
const FIX_CLOSE: &str = "[/FIX]";
const SUCCESS: &str = "[SUCCESS]";

/// Block tags that wrap a span of output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Log,
    Error,
    Analysis,
}

impl Tag {
    fn open_marker(self) -> &'static str {
        match self {
            Tag::Log => "[LOG]",
            Tag::Error => "[ERROR]",
            Tag::Analysis => "[ANALYSIS]",
        }
    }

    fn close_marker(self) -> &'static str {
        match self {
            Tag::Log => "[/LOG]",
            Tag::Error => "[/ERROR]",
            Tag::Analysis => "[/ANALYSIS]",
        }
    }
}

/// State transitions announced by the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildSignal {
    Error,
    Analysis,
    Success,
}

/// A recognized segment of the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerEvent {
    /// Text of a closed block, or the end-of-stream flush.
    Log(String),
    /// Replacement content for a project file, whitespace-trimmed.
    Fix { path: String, content: String },
    /// A state transition. `Error` and `Analysis` fire when the block opens,
    /// before its content is known; `Success` fires on the bare marker.
    State(BuildSignal),
}

/// Incremental marker parser. Create one per streaming invocation.
#[derive(Debug, Default)]
pub struct MarkerParser {
    buffer: String,
    active_tag: Option<Tag>,
    fix_path: Option<String>,
}

impl MarkerParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every event it completes, in close order.
    pub fn push(&mut self, chunk: &str) -> Vec<MarkerEvent> {
        self.buffer.push_str(chunk);
        let mut events = Vec::new();
        while self.scan_pass(&mut events) {}
        events
    }

    /// End of stream: flush any remaining buffered text as a single log
    /// event so trailing (or unterminated) content is never dropped.
    pub fn finish(mut self) -> Vec<MarkerEvent> {
        let mut events = Vec::new();
        if !self.buffer.is_empty() {
            events.push(MarkerEvent::Log(std::mem::take(&mut self.buffer)));
        }
        events
    }

    /// Consume the earliest complete marker. Returns true if one was found.
    fn scan_pass(&mut self, events: &mut Vec<MarkerEvent>) -> bool {
        let Some(marker) = self.next_marker() else {
            return false;
        };

        match marker {
            Marker::FixOpen { end, path } => {
                // Text before an open marker is dropped with it.
                self.fix_path = Some(path);
                self.buffer.drain(..end);
            }
            Marker::FixClose { start } => {
                let content = self.buffer[..start].trim().to_string();
                if let Some(path) = self.fix_path.take() {
                    events.push(MarkerEvent::Fix { path, content });
                }
                self.buffer.drain(..start + FIX_CLOSE.len());
            }
            Marker::TagOpen { start, tag } => {
                // Opening ERROR/ANALYSIS fires the state change immediately;
                // a previously active tag is replaced.
                self.active_tag = Some(tag);
                match tag {
                    Tag::Error => events.push(MarkerEvent::State(BuildSignal::Error)),
                    Tag::Analysis => events.push(MarkerEvent::State(BuildSignal::Analysis)),
                    Tag::Log => {}
                }
                self.buffer.drain(..start + tag.open_marker().len());
            }
            Marker::TagClose { start, tag } => {
                events.push(MarkerEvent::Log(self.buffer[..start].to_string()));
                self.active_tag = None;
                self.buffer.drain(..start + tag.close_marker().len());
            }
            Marker::Success { start } => {
                events.push(MarkerEvent::State(BuildSignal::Success));
                self.buffer.drain(..start + SUCCESS.len());
            }
        }

        true
    }

    /// Find the earliest complete marker in the buffer. Probes run in a
    /// fixed priority order; an earlier start index always wins, so priority
    /// only matters for the (unreachable) equal-index case.
    fn next_marker(&self) -> Option<Marker> {
        let mut found: Option<(usize, Marker)> = None;
        let mut consider = |start: usize, marker: Marker| {
            if found.as_ref().map_or(true, |(best, _)| start < *best) {
                found = Some((start, marker));
            }
        };

        if let Some((start, end, path)) = find_fix_open(&self.buffer) {
            consider(start, Marker::FixOpen { end, path });
        }
        if self.fix_path.is_some() {
            if let Some(start) = self.buffer.find(FIX_CLOSE) {
                consider(start, Marker::FixClose { start });
            }
        }
        if let Some((start, tag)) = find_tag_open(&self.buffer) {
            consider(start, Marker::TagOpen { start, tag });
        }
        if let Some(tag) = self.active_tag {
            if let Some(start) = self.buffer.find(tag.close_marker()) {
                consider(start, Marker::TagClose { start, tag });
            }
        }
        if let Some(start) = self.buffer.find(SUCCESS) {
            consider(start, Marker::Success { start });
        }

        found.map(|(_, marker)| marker)
    }
}

/// A complete marker located in the buffer.
#[derive(Debug)]
enum Marker {
    FixOpen { end: usize, path: String },
    FixClose { start: usize },
    TagOpen { start: usize, tag: Tag },
    TagClose { start: usize, tag: Tag },
    Success { start: usize },
}

/// Find the earliest complete `[FIX:path]` marker. Returns the marker's
/// start, the byte index one past it, and the path. The path must be
/// non-empty and runs to the first `]`; an occurrence with an empty path is
/// skipped, matching the reference pattern `\[FIX:([^\]]+)\]`.
fn find_fix_open(buffer: &str) -> Option<(usize, usize, String)> {
    for (start, _) in buffer.match_indices(FIX_OPEN) {
        let rest = &buffer[start + FIX_OPEN.len()..];
        if let Some(close) = rest.find(']') {
            if close > 0 {
                let end = start + FIX_OPEN.len() + close + 1;
                return Some((start, end, rest[..close].to_string()));
            }
        }
    }
    None
}

/// Find the earliest open tag of any block kind.
fn find_tag_open(buffer: &str) -> Option<(usize, Tag)> {
    [Tag::Log, Tag::Error, Tag::Analysis]
        .into_iter()
        .filter_map(|tag| buffer.find(tag.open_marker()).map(|idx| (idx, tag)))
        .min_by_key(|&(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_chunks(chunks: &[&str]) -> Vec<MarkerEvent> {
        let mut parser = MarkerParser::new();
        let mut events = Vec::new();
        for chunk in chunks {
            events.extend(parser.push(chunk));
        }
        events.extend(parser.finish());
        events
    }

    fn parse_whole(text: &str) -> Vec<MarkerEvent> {
        parse_chunks(&[text])
    }

    fn log(text: &str) -> MarkerEvent {
        MarkerEvent::Log(text.to_string())
    }

    #[test]
    fn log_block_emits_once() {
        let events = parse_whole("[LOG]hello[/LOG]");
        assert_eq!(events, vec![log("hello")]);
    }

    #[test]
    fn error_state_fires_before_payload() {
        let events = parse_whole("[ERROR]oops[/ERROR]");
        assert_eq!(
            events,
            vec![MarkerEvent::State(BuildSignal::Error), log("oops")]
        );
    }

    #[test]
    fn analysis_state_fires_on_open() {
        let mut parser = MarkerParser::new();
        let events = parser.push("[ANALYSIS]looking into it");
        // State change is visible before the block closes.
        assert_eq!(events, vec![MarkerEvent::State(BuildSignal::Analysis)]);
        let events = parser.push("[/ANALYSIS]");
        assert_eq!(events, vec![log("looking into it")]);
    }

    #[test]
    fn fix_block_trims_whitespace() {
        let events = parse_whole("[FIX:a.txt]  new content  [/FIX]");
        assert_eq!(
            events,
            vec![MarkerEvent::Fix {
                path: "a.txt".to_string(),
                content: "new content".to_string(),
            }]
        );
    }

    #[test]
    fn fix_only_fires_on_close() {
        let mut parser = MarkerParser::new();
        assert!(parser.push("[FIX:configs/kernel_fragment.config]CONFIG_TTY=y").is_empty());
        let events = parser.push("[/FIX]");
        assert_eq!(
            events,
            vec![MarkerEvent::Fix {
                path: "configs/kernel_fragment.config".to_string(),
                content: "CONFIG_TTY=y".to_string(),
            }]
        );
    }

    #[test]
    fn bare_success_marker() {
        let events = parse_whole("[SUCCESS]");
        assert_eq!(events, vec![MarkerEvent::State(BuildSignal::Success)]);
    }

    #[test]
    fn marker_split_across_chunks() {
        let events = parse_chunks(&["[LO", "G]boot", " ok[/L", "OG]"]);
        assert_eq!(events, vec![log("boot ok")]);
    }

    #[test]
    fn fix_path_split_across_chunks() {
        let events = parse_chunks(&["[FIX:scripts/bu", "ild.sh]set -e[/FIX]"]);
        assert_eq!(
            events,
            vec![MarkerEvent::Fix {
                path: "scripts/build.sh".to_string(),
                content: "set -e".to_string(),
            }]
        );
    }

    #[test]
    fn trailing_unterminated_block_flushes_as_log() {
        let events = parse_chunks(&["[LOG]partial"]);
        assert_eq!(events, vec![log("partial")]);
    }

    #[test]
    fn trailing_plain_text_flushes_as_log() {
        let events = parse_chunks(&["[LOG]a[/LOG]", "leftover"]);
        assert_eq!(events, vec![log("a"), log("leftover")]);
    }

    #[test]
    fn empty_stream_emits_nothing() {
        assert!(parse_chunks(&[]).is_empty());
        assert!(parse_whole("").is_empty());
    }

    #[test]
    fn mismatched_close_stays_literal() {
        // [/ERROR] is not the active close, so it lands inside the content.
        let events = parse_whole("[LOG]a[/ERROR]b[/LOG]");
        assert_eq!(events, vec![log("a[/ERROR]b")]);
    }

    #[test]
    fn close_without_open_is_ignored() {
        let events = parse_whole("[/LOG]stray");
        assert_eq!(events, vec![log("[/LOG]stray")]);
    }

    #[test]
    fn unterminated_fix_flushes_raw() {
        // No [/FIX] ever arrives: the interior is flushed as plain log text.
        let events = parse_chunks(&["[FIX:a.txt]orphan content"]);
        assert_eq!(events, vec![log("orphan content")]);
    }

    #[test]
    fn empty_fix_path_is_not_a_marker() {
        let events = parse_whole("[FIX:][LOG]x[/LOG]");
        assert_eq!(events, vec![log("x")]);
    }

    #[test]
    fn sequential_blocks_in_close_order() {
        let text = "[LOG]one[/LOG][ERROR]two[/ERROR][ANALYSIS]three[/ANALYSIS][SUCCESS]";
        let events = parse_whole(text);
        assert_eq!(
            events,
            vec![
                log("one"),
                MarkerEvent::State(BuildSignal::Error),
                log("two"),
                MarkerEvent::State(BuildSignal::Analysis),
                log("three"),
                MarkerEvent::State(BuildSignal::Success),
            ]
        );
    }

    #[test]
    fn full_build_scenario() {
        let text = "[LOG]make -j8[/LOG]\
                    [ERROR]virtio_console: undefined symbol[/ERROR]\
                    [ANALYSIS]missing CONFIG_VIRTIO_CONSOLE[/ANALYSIS]\
                    [FIX:configs/kernel_fragment.config]\nCONFIG_VIRTIO_CONSOLE=y\n[/FIX]\
                    [LOG]build finished[/LOG][SUCCESS]";
        let events = parse_whole(text);
        assert_eq!(
            events,
            vec![
                log("make -j8"),
                MarkerEvent::State(BuildSignal::Error),
                log("virtio_console: undefined symbol"),
                MarkerEvent::State(BuildSignal::Analysis),
                log("missing CONFIG_VIRTIO_CONSOLE"),
                MarkerEvent::Fix {
                    path: "configs/kernel_fragment.config".to_string(),
                    content: "CONFIG_VIRTIO_CONSOLE=y".to_string(),
                },
                log("build finished"),
                MarkerEvent::State(BuildSignal::Success),
            ]
        );
    }

    #[test]
    fn chunk_boundary_independent() {
        let text = "[LOG]make -j8[/LOG][ERROR]fail[/ERROR][ANALYSIS]why[/ANALYSIS]\
                    [FIX:cfg] x [/FIX][LOG]ok[/LOG][SUCCESS]tail";
        let expected = parse_whole(text);

        // Every two-way split.
        for (split, _) in text.char_indices() {
            let events = parse_chunks(&[&text[..split], &text[split..]]);
            assert_eq!(events, expected, "split at byte {split}");
        }

        // One character per chunk.
        let chars: Vec<String> = text.chars().map(|c| c.to_string()).collect();
        let refs: Vec<&str> = chars.iter().map(|s| s.as_str()).collect();
        assert_eq!(parse_chunks(&refs), expected);
    }

    #[test]
    fn reopened_tag_replaces_active_one() {
        // A second open tag before the first closes replaces it; the
        // orphaned prefix is dropped with the new marker.
        let events = parse_whole("[LOG]a[ERROR]b[/ERROR]");
        assert_eq!(
            events,
            vec![MarkerEvent::State(BuildSignal::Error), log("b")]
        );
    }

    #[test]
    fn text_between_blocks_is_dropped() {
        // Inter-block filler is consumed with the next marker, as in the
        // reference behavior.
        let events = parse_whole("[LOG]a[/LOG]filler[LOG]b[/LOG]");
        assert_eq!(events, vec![log("a"), log("b")]);
    }

    #[test]
    fn success_inside_open_log_preempts_close() {
        // [SUCCESS] starts before [/LOG], so it is consumed first; the text
        // preceding it is dropped and the close emits what remains.
        let events = parse_whole("[LOG]pre[SUCCESS]post[/LOG]");
        assert_eq!(
            events,
            vec![MarkerEvent::State(BuildSignal::Success), log("post")]
        );
    }
}
