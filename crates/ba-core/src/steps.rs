//! Build pipeline state: four ordered steps with gating.

use ba_protocol::{BuildStep, StepStatus, STEP_NAMES};

/// The generate → setup → build → test pipeline.
#[derive(Debug)]
pub struct Pipeline {
    steps: Vec<BuildStep>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            steps: STEP_NAMES.iter().map(|n| BuildStep::pending(*n)).collect(),
        }
    }

    pub fn steps(&self) -> &[BuildStep] {
        &self.steps
    }

    pub fn status(&self, name: &str) -> Option<StepStatus> {
        self.steps.iter().find(|s| s.name == name).map(|s| s.status)
    }

    /// Update a step's status. Unknown names are ignored.
    pub fn set_status(&mut self, name: &str, status: StepStatus) {
        if let Some(step) = self.steps.iter_mut().find(|s| s.name == name) {
            step.status = status;
        }
    }

    /// A step may run when every step before it has succeeded. The first
    /// step is always ready.
    pub fn ready_for(&self, name: &str) -> bool {
        let Some(index) = self.steps.iter().position(|s| s.name == name) else {
            return false;
        };
        self.steps[..index].iter().all(|s| s.status.is_success())
    }

    pub fn all_success(&self) -> bool {
        self.steps.iter().all(|s| s.status.is_success())
    }
}
