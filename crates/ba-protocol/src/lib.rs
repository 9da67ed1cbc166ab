//! ba-protocol: Shared types for the build agent.
//!
//! This crate defines the types exchanged between the LLM backend and the
//! core application: streaming events, generated project files, and the
//! build pipeline steps.

pub mod message;
pub mod project;

pub use message::StreamEvent;
pub use project::{BuildStep, ProjectFile, StepStatus, STEP_NAMES};
