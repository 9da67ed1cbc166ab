//! ba-core: orchestration and CLI for the AI Linux build agent.
//!
//! The agent drives a four-step pipeline against a streaming LLM backend:
//! generate a Buildroot project skeleton, then simulate running its setup,
//! build, and test scripts. The build step streams control markers that the
//! parser in [`markers`] turns into log blocks, file fixes, and state
//! transitions.

pub mod config;
pub mod markers;
pub mod output;
pub mod project;
pub mod prompts;
pub mod repl;
pub mod session;
pub mod steps;

pub use markers::{BuildSignal, MarkerEvent, MarkerParser};
pub use project::FileStore;
pub use session::BuildSession;
pub use steps::Pipeline;
