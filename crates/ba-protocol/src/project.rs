//! Project files and build pipeline steps.

use serde::{Deserialize, Serialize};

/// A generated project file held in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    /// Relative path, e.g. `scripts/build.sh`.
    pub name: String,
    /// Display language hint, e.g. `bash` or `makefile`.
    pub language: String,
    /// Full file content.
    pub content: String,
}

impl ProjectFile {
    pub fn new(
        name: impl Into<String>,
        language: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
            content: content.into(),
        }
    }
}

/// Status of a single pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Success,
    Failed,
    /// The agent found an error and is applying a fix.
    Fixing,
}

impl StepStatus {
    /// Terminal-successful state required before the next step may run.
    pub fn is_success(self) -> bool {
        self == StepStatus::Success
    }
}

/// A named pipeline step with its current status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStep {
    pub name: String,
    pub status: StepStatus,
}

impl BuildStep {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Pending,
        }
    }
}

/// The canonical pipeline, in execution order.
pub const STEP_NAMES: [&str; 4] = [
    "Generate Project Files",
    "Execute setup.sh",
    "Execute build.sh",
    "Execute test.sh",
];
