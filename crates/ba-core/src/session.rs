//! Build session orchestration.
//!
//! A session owns the backend client, the generated files, the pipeline
//! state, and the output sink. Each pipeline step maps to one backend
//! interaction: file generation is a batch of non-streaming requests,
//! setup/test replay a script as a streamed log, and the build step runs
//! the marker-driven failure/fix/retry simulation.

use std::io::Write;
use std::path::Path;

use futures::{future, Stream, StreamExt};

use ba_backend::GeminiClient;
use ba_protocol::{ProjectFile, StepStatus, StreamEvent, STEP_NAMES};

use crate::markers::{BuildSignal, MarkerEvent, MarkerParser};
use crate::output::BuildOutput;
use crate::project::FileStore;
use crate::prompts::{build_prompt, execute_script_prompt, generation_prompt, FILE_PROMPTS};
use crate::steps::Pipeline;

pub const GENERATE_STEP: &str = STEP_NAMES[0];
pub const SETUP_STEP: &str = STEP_NAMES[1];
pub const BUILD_STEP: &str = STEP_NAMES[2];
pub const TEST_STEP: &str = STEP_NAMES[3];

const BUILD_SCRIPT: &str = "scripts/build.sh";
const DEFCONFIG: &str = "configs/tiny_linux_defconfig";
const KERNEL_FRAGMENT: &str = "configs/kernel_fragment.config";

pub struct BuildSession<W: Write> {
    client: GeminiClient,
    pub files: FileStore,
    pub pipeline: Pipeline,
    pub output: BuildOutput<W>,
}

impl<W: Write> BuildSession<W> {
    pub fn new(client: GeminiClient, output: BuildOutput<W>) -> Self {
        Self {
            client,
            files: FileStore::new(),
            pipeline: Pipeline::new(),
            output,
        }
    }

    /// Step 1: generate the six project files concurrently. All must
    /// succeed for the step to pass.
    pub async fn generate_files(&mut self) -> bool {
        self.pipeline.set_status(GENERATE_STEP, StepStatus::Running);
        self.output.banner(GENERATE_STEP);

        let client = &self.client;
        let results = future::join_all(FILE_PROMPTS.iter().map(|spec| async move {
            let prompt = generation_prompt(spec);
            (spec, client.generate(&prompt).await)
        }))
        .await;

        let mut ok = true;
        for (spec, result) in results {
            match result {
                Ok(content) => {
                    self.output.log_line(&format!("generated {}", spec.name));
                    self.files
                        .insert(ProjectFile::new(spec.name, spec.language, content.trim()));
                }
                Err(e) => {
                    self.output
                        .log_line(&format!("[ERROR] failed to generate {}: {e}", spec.name));
                    ok = false;
                }
            }
        }

        if ok {
            self.pipeline.set_status(GENERATE_STEP, StepStatus::Success);
            self.output
                .log_line("[SUCCESS] Project files generated. Please review them.");
        } else {
            self.pipeline.set_status(GENERATE_STEP, StepStatus::Failed);
        }
        ok
    }

    /// Step 2: replay scripts/setup.sh as a simulated shell session.
    pub async fn run_setup(&mut self) -> bool {
        self.run_script("scripts/setup.sh", SETUP_STEP).await
    }

    /// Step 4: replay scripts/test.sh (QEMU boot) as a simulated shell
    /// session.
    pub async fn run_test(&mut self) -> bool {
        self.run_script("scripts/test.sh", TEST_STEP).await
    }

    async fn run_script(&mut self, script_name: &str, step_name: &str) -> bool {
        if !self.pipeline.ready_for(step_name) {
            self.output
                .error(&format!("'{step_name}' needs the previous steps to succeed first"));
            return false;
        }
        let prompt = match self.files.get(script_name) {
            Some(script) => execute_script_prompt(script),
            None => {
                self.output
                    .log_line(&format!("[ERROR] Script not found: {script_name}"));
                self.pipeline.set_status(step_name, StepStatus::Failed);
                return false;
            }
        };

        self.pipeline.set_status(step_name, StepStatus::Running);
        self.output.banner(step_name);

        let stream = self.client.stream(&prompt);
        match consume_script_stream(stream, &mut self.output).await {
            Ok(()) => {
                self.pipeline.set_status(step_name, StepStatus::Success);
                true
            }
            Err(msg) => {
                self.output.error(&msg);
                self.pipeline.set_status(step_name, StepStatus::Failed);
                false
            }
        }
    }

    /// Step 3: the marker-driven build simulation. The stream drives the
    /// pipeline state (Failed on [ERROR], Fixing on [ANALYSIS], Success on
    /// [SUCCESS]) and may rewrite a generated file via [FIX:path].
    pub async fn run_build(&mut self) -> bool {
        if !self.pipeline.ready_for(BUILD_STEP) {
            self.output
                .error(&format!("'{BUILD_STEP}' needs the previous steps to succeed first"));
            return false;
        }
        let prompt = {
            let build = self.files.get(BUILD_SCRIPT);
            let defconfig = self.files.get(DEFCONFIG);
            let fragment = self.files.get(KERNEL_FRAGMENT);
            match (build, defconfig, fragment) {
                (Some(b), Some(d), Some(f)) => build_prompt(b, d, f),
                _ => {
                    self.output.log_line("[ERROR] Build input files not found.");
                    self.pipeline.set_status(BUILD_STEP, StepStatus::Failed);
                    return false;
                }
            }
        };

        self.pipeline.set_status(BUILD_STEP, StepStatus::Running);
        self.output.banner(BUILD_STEP);

        let stream = self.client.stream(&prompt);
        let result =
            consume_build_stream(stream, &mut self.files, &mut self.pipeline, &mut self.output)
                .await;

        match result {
            Ok(()) => {
                if self.pipeline.status(BUILD_STEP) == Some(StepStatus::Success) {
                    true
                } else {
                    // No [SUCCESS] token arrived; a scripted failure without
                    // a recovery, or a truncated stream.
                    if self.pipeline.status(BUILD_STEP) != Some(StepStatus::Failed) {
                        self.output.error("build stream ended without a success token");
                        self.pipeline.set_status(BUILD_STEP, StepStatus::Failed);
                    }
                    false
                }
            }
            Err(msg) => {
                self.output.error(&msg);
                self.pipeline.set_status(BUILD_STEP, StepStatus::Failed);
                false
            }
        }
    }

    /// Run the whole pipeline, stopping at the first failed step.
    pub async fn run_all(&mut self) -> bool {
        self.generate_files().await
            && self.run_setup().await
            && self.run_build().await
            && self.run_test().await
    }

    pub fn show_status(&mut self) {
        self.output.step_indicator(&self.pipeline);
    }

    pub fn show_files(&mut self) {
        self.output.file_list(&self.files);
    }

    pub fn show_file(&mut self, name: &str) {
        match self.files.get(name).cloned() {
            Some(file) => self.output.file_content(&file),
            None => self.output.error(&format!("no such file: {name}")),
        }
    }

    pub fn export(&mut self, dir: &Path) {
        if self.files.is_empty() {
            self.output.error("nothing to export; run 'generate' first");
            return;
        }
        match self.files.export(dir) {
            Ok(()) => self
                .output
                .log_line(&format!("exported {} files to {}", self.files.len(), dir.display())),
            Err(e) => self.output.error(&format!("export failed: {e}")),
        }
    }
}

/// Drain a script-execution stream into the output, line-buffered so text
/// split across deltas still renders as whole lines.
pub async fn consume_script_stream<W: Write>(
    stream: impl Stream<Item = StreamEvent>,
    output: &mut BuildOutput<W>,
) -> Result<(), String> {
    let mut stream = std::pin::pin!(stream);
    let mut pending = String::new();
    while let Some(event) = stream.next().await {
        match event {
            StreamEvent::TextDelta(text) => {
                pending.push_str(&text);
                while let Some(pos) = pending.find('\n') {
                    let line: String = pending.drain(..=pos).collect();
                    output.log_line(line.trim_end_matches('\n'));
                }
            }
            StreamEvent::Usage {
                input_tokens,
                output_tokens,
            } => output.record_usage(input_tokens, output_tokens),
            StreamEvent::Done => break,
            StreamEvent::Error(msg) => return Err(msg),
        }
    }
    if !pending.is_empty() {
        output.log_line(&pending);
    }
    output.usage_summary();
    Ok(())
}

/// Drain a build-simulation stream through the marker parser, applying each
/// event to the file store, pipeline, and output as it completes.
pub async fn consume_build_stream<W: Write>(
    stream: impl Stream<Item = StreamEvent>,
    files: &mut FileStore,
    pipeline: &mut Pipeline,
    output: &mut BuildOutput<W>,
) -> Result<(), String> {
    let mut stream = std::pin::pin!(stream);
    let mut parser = MarkerParser::new();
    while let Some(event) = stream.next().await {
        match event {
            StreamEvent::TextDelta(text) => {
                for marker in parser.push(&text) {
                    apply_marker_event(marker, files, pipeline, output);
                }
            }
            StreamEvent::Usage {
                input_tokens,
                output_tokens,
            } => output.record_usage(input_tokens, output_tokens),
            StreamEvent::Done => break,
            StreamEvent::Error(msg) => return Err(msg),
        }
    }
    for marker in parser.finish() {
        apply_marker_event(marker, files, pipeline, output);
    }
    output.usage_summary();
    Ok(())
}

fn apply_marker_event<W: Write>(
    event: MarkerEvent,
    files: &mut FileStore,
    pipeline: &mut Pipeline,
    output: &mut BuildOutput<W>,
) {
    match event {
        MarkerEvent::Log(text) => output.log_text(&text),
        MarkerEvent::Fix { path, content } => {
            output.log_line(&format!("[AGENT] Applying fix to {path}..."));
            if !files.apply_fix(&path, &content) {
                output.log_line(&format!("[AGENT] No generated file at {path}; fix skipped"));
            }
        }
        MarkerEvent::State(BuildSignal::Error) => {
            pipeline.set_status(BUILD_STEP, StepStatus::Failed);
        }
        MarkerEvent::State(BuildSignal::Analysis) => {
            pipeline.set_status(BUILD_STEP, StepStatus::Fixing);
        }
        MarkerEvent::State(BuildSignal::Success) => {
            pipeline.set_status(BUILD_STEP, StepStatus::Success);
            output.log_line("[SUCCESS] Build complete!");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ba_backend::mock::fixtures;
    use ba_backend::MockScript;

    fn plain_output() -> BuildOutput<Vec<u8>> {
        BuildOutput::new(Vec::new(), false)
    }

    fn rendered(output: BuildOutput<Vec<u8>>) -> String {
        String::from_utf8(output.into_inner()).unwrap()
    }

    #[test]
    fn step_name_constants_cover_pipeline() {
        assert_eq!(
            [GENERATE_STEP, SETUP_STEP, BUILD_STEP, TEST_STEP],
            STEP_NAMES
        );
    }

    #[tokio::test]
    async fn script_stream_rejoins_split_lines() {
        let script = MockScript::text(&["mkdir -p build\nclon", "ing buildroot...\ndone\n"]);
        let mut output = plain_output();
        consume_script_stream(script.into_stream(), &mut output)
            .await
            .unwrap();
        assert_eq!(rendered(output), "mkdir -p build\ncloning buildroot...\ndone\n");
    }

    #[tokio::test]
    async fn script_stream_flushes_trailing_partial_line() {
        let script = MockScript::text(&["no trailing newline"]);
        let mut output = plain_output();
        consume_script_stream(script.into_stream(), &mut output)
            .await
            .unwrap();
        assert_eq!(rendered(output), "no trailing newline\n");
    }

    #[tokio::test]
    async fn script_stream_propagates_backend_error() {
        let script = fixtures::error_mid_stream("$ git clone...\n", "429 rate limited");
        let mut output = plain_output();
        let err = consume_script_stream(script.into_stream(), &mut output)
            .await
            .unwrap_err();
        assert_eq!(err, "429 rate limited");
        // Text streamed before the error is still shown.
        assert!(rendered(output).contains("$ git clone..."));
    }

    #[tokio::test]
    async fn build_stream_applies_fix_and_succeeds() {
        let mut files = FileStore::new();
        files.insert(ProjectFile::new(
            KERNEL_FRAGMENT,
            "makefile",
            "CONFIG_TTY=y",
        ));
        let mut pipeline = Pipeline::new();
        pipeline.set_status(BUILD_STEP, StepStatus::Running);
        let mut output = plain_output();

        let script = fixtures::build_with_fix(
            KERNEL_FRAGMENT,
            "CONFIG_TTY=y\nCONFIG_VIRTIO_CONSOLE=y",
        );
        consume_build_stream(script.into_stream(), &mut files, &mut pipeline, &mut output)
            .await
            .unwrap();

        assert_eq!(
            files.get(KERNEL_FRAGMENT).unwrap().content,
            "CONFIG_TTY=y\nCONFIG_VIRTIO_CONSOLE=y"
        );
        assert_eq!(pipeline.status(BUILD_STEP), Some(StepStatus::Success));

        let text = rendered(output);
        let fix_at = text.find("[AGENT] Applying fix to").unwrap();
        let success_at = text.find("[SUCCESS] Build complete!").unwrap();
        assert!(fix_at < success_at);
    }

    #[tokio::test]
    async fn build_stream_fix_for_unknown_file_is_skipped() {
        let mut files = FileStore::new();
        let mut pipeline = Pipeline::new();
        let mut output = plain_output();

        let script = fixtures::build_with_fix("configs/other.config", "X=y");
        consume_build_stream(script.into_stream(), &mut files, &mut pipeline, &mut output)
            .await
            .unwrap();

        assert!(files.is_empty());
        let text = rendered(output);
        assert!(text.contains("fix skipped"));
        // The stream still ends in success; the fix path is advisory.
        assert_eq!(pipeline.status(BUILD_STEP), Some(StepStatus::Success));
    }
}
