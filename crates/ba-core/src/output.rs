//! Terminal output for the build agent.
//!
//! TTY output gets ANSI color (respecting `NO_COLOR`); non-TTY output is
//! plain text, one line per event, suitable for piping to a file.

use std::io::Write;

use ba_protocol::{ProjectFile, StepStatus};

use crate::project::FileStore;
use crate::steps::Pipeline;

/// Check if color output is enabled (respects `NO_COLOR` env var).
pub fn color_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

/// ANSI style helper. All accessors return empty strings when disabled.
#[derive(Debug, Clone, Copy)]
pub struct Style {
    enabled: bool,
}

impl Style {
    fn code(&self, code: &'static str) -> &'static str {
        if self.enabled {
            code
        } else {
            ""
        }
    }

    pub fn dim(&self) -> &'static str {
        self.code("\x1b[2m")
    }

    pub fn red(&self) -> &'static str {
        self.code("\x1b[31m")
    }

    pub fn green(&self) -> &'static str {
        self.code("\x1b[32m")
    }

    pub fn yellow(&self) -> &'static str {
        self.code("\x1b[33m")
    }

    pub fn cyan(&self) -> &'static str {
        self.code("\x1b[36m")
    }

    pub fn reset(&self) -> &'static str {
        self.code("\x1b[0m")
    }
}

/// Format a token count for display: `340` for small, `1.2k` for 1000+.
pub fn format_tokens(n: u32) -> String {
    if n >= 1000 {
        let k = n as f64 / 1000.0;
        format!("{k:.1}k")
    } else {
        n.to_string()
    }
}

/// How a log line should be colored, keyed on the marker prefix the
/// simulation prompt uses.
fn line_style(style: &Style, line: &str) -> &'static str {
    if line.starts_with("[ERROR]") {
        style.red()
    } else if line.starts_with("[SUCCESS]") {
        style.green()
    } else if line.starts_with("[AGENT]") || line.starts_with("[ANALYSIS]") {
        style.cyan()
    } else {
        ""
    }
}

fn status_glyph(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Pending => "·",
        StepStatus::Running => "»",
        StepStatus::Success => "✓",
        StepStatus::Failed => "✗",
        StepStatus::Fixing => "⚑",
    }
}

fn status_style(style: &Style, status: StepStatus) -> &'static str {
    match status {
        StepStatus::Pending => style.dim(),
        StepStatus::Running => style.cyan(),
        StepStatus::Success => style.green(),
        StepStatus::Failed => style.red(),
        StepStatus::Fixing => style.yellow(),
    }
}

/// Formats all build agent output.
pub struct BuildOutput<W: Write> {
    writer: W,
    style: Style,
    term_width: u16,
    input_tokens: u32,
    output_tokens: u32,
}

impl<W: Write> BuildOutput<W> {
    pub fn new(writer: W, is_tty: bool) -> Self {
        let term_width = if is_tty {
            crossterm::terminal::size().map(|(w, _)| w).unwrap_or(80)
        } else {
            80
        };
        Self {
            writer,
            style: Style {
                enabled: is_tty && color_enabled(),
            },
            term_width,
            input_tokens: 0,
            output_tokens: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Emit a section boundary, truncated to the terminal width.
    pub fn banner(&mut self, text: &str) {
        let text = self.truncate_to_width(text);
        let _ = writeln!(
            self.writer,
            "{}--- {text}{}",
            self.style.cyan(),
            self.style.reset()
        );
    }

    /// Emit a block of log text, one line at a time.
    pub fn log_text(&mut self, text: &str) {
        for line in text.lines() {
            self.log_line(line);
        }
    }

    /// Emit a single log line, colored by its marker prefix.
    pub fn log_line(&mut self, line: &str) {
        let color = line_style(&self.style, line);
        let _ = writeln!(self.writer, "{color}{line}{}", self.style.reset());
    }

    /// Emit an error line (persists in red).
    pub fn error(&mut self, msg: &str) {
        let _ = writeln!(
            self.writer,
            "{}error: {msg}{}",
            self.style.red(),
            self.style.reset()
        );
    }

    /// Record the most recent usage report. Gemini sends cumulative counts,
    /// so the latest report wins.
    pub fn record_usage(&mut self, input_tokens: u32, output_tokens: u32) {
        self.input_tokens = input_tokens;
        self.output_tokens = output_tokens;
    }

    /// Emit a dim one-line usage summary, if any usage was reported.
    pub fn usage_summary(&mut self) {
        if self.input_tokens == 0 && self.output_tokens == 0 {
            return;
        }
        let _ = writeln!(
            self.writer,
            "{}tokens: {} in / {} out{}",
            self.style.dim(),
            format_tokens(self.input_tokens),
            format_tokens(self.output_tokens),
            self.style.reset()
        );
    }

    /// Render the step indicator, one line per pipeline step.
    pub fn step_indicator(&mut self, pipeline: &Pipeline) {
        for step in pipeline.steps() {
            let color = status_style(&self.style, step.status);
            let _ = writeln!(
                self.writer,
                "  {color}{} {}{}",
                status_glyph(step.status),
                step.name,
                self.style.reset()
            );
        }
    }

    /// Render the generated file listing.
    pub fn file_list(&mut self, files: &FileStore) {
        if files.is_empty() {
            let _ = writeln!(self.writer, "no files generated yet");
            return;
        }
        for file in files.files() {
            let _ = writeln!(
                self.writer,
                "  {} {}({}, {} bytes){}",
                file.name,
                self.style.dim(),
                file.language,
                file.content.len(),
                self.style.reset()
            );
        }
    }

    /// Render one file with a header banner.
    pub fn file_content(&mut self, file: &ProjectFile) {
        self.banner(&file.name);
        let _ = writeln!(self.writer, "{}", file.content);
    }

    fn truncate_to_width(&self, s: &str) -> String {
        // "--- " prefix plus content
        let max_content = (self.term_width as usize).saturating_sub(4);
        if s.chars().count() > max_content && max_content > 3 {
            let mut truncated: String = s.chars().take(max_content - 3).collect();
            truncated.push_str("...");
            truncated
        } else {
            s.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ba_protocol::STEP_NAMES;

    fn plain_output() -> BuildOutput<Vec<u8>> {
        // is_tty = false: no ANSI codes, fixed 80-column width
        BuildOutput::new(Vec::new(), false)
    }

    fn rendered(output: BuildOutput<Vec<u8>>) -> String {
        String::from_utf8(output.into_inner()).unwrap()
    }

    #[test]
    fn plain_log_line_has_no_ansi() {
        let mut output = plain_output();
        output.log_line("[ERROR] boom");
        let text = rendered(output);
        assert_eq!(text, "[ERROR] boom\n");
    }

    #[test]
    fn log_text_splits_lines() {
        let mut output = plain_output();
        output.log_text("one\ntwo\n");
        assert_eq!(rendered(output), "one\ntwo\n");
    }

    #[test]
    fn banner_prefix() {
        let mut output = plain_output();
        output.banner("Execute build.sh");
        assert_eq!(rendered(output), "--- Execute build.sh\n");
    }

    #[test]
    fn banner_truncated_to_width() {
        let mut output = plain_output();
        output.banner(&"x".repeat(200));
        let text = rendered(output);
        assert!(text.len() < 90);
        assert!(text.trim_end().ends_with("..."));
    }

    #[test]
    fn usage_summary_skipped_when_empty() {
        let mut output = plain_output();
        output.usage_summary();
        assert_eq!(rendered(output), "");
    }

    #[test]
    fn usage_summary_latest_report_wins() {
        let mut output = plain_output();
        output.record_usage(500, 100);
        output.record_usage(812, 1340);
        output.usage_summary();
        assert_eq!(rendered(output), "tokens: 812 in / 1.3k out\n");
    }

    #[test]
    fn step_indicator_lists_all_steps() {
        let mut output = plain_output();
        let pipeline = Pipeline::new();
        output.step_indicator(&pipeline);
        let text = rendered(output);
        for name in STEP_NAMES {
            assert!(text.contains(name));
        }
        assert_eq!(text.matches('·').count(), 4);
    }

    #[test]
    fn file_list_empty_store() {
        let mut output = plain_output();
        output.file_list(&FileStore::new());
        assert_eq!(rendered(output), "no files generated yet\n");
    }

    #[test]
    fn format_tokens_boundaries() {
        assert_eq!(format_tokens(0), "0");
        assert_eq!(format_tokens(999), "999");
        assert_eq!(format_tokens(1000), "1.0k");
        assert_eq!(format_tokens(15600), "15.6k");
    }

    #[test]
    fn line_style_classification() {
        let style = Style { enabled: true };
        assert_eq!(line_style(&style, "[ERROR] x"), "\x1b[31m");
        assert_eq!(line_style(&style, "[SUCCESS] x"), "\x1b[32m");
        assert_eq!(line_style(&style, "[AGENT] x"), "\x1b[36m");
        assert_eq!(line_style(&style, "[ANALYSIS] x"), "\x1b[36m");
        assert_eq!(line_style(&style, "plain"), "");
    }
}
