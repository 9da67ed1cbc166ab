//! ba-backend: LLM provider adapter for the build agent.
//!
//! Provides the Gemini API client used for project file generation and
//! streaming build simulation, plus a mock backend that produces the same
//! `StreamEvent` sequences for tests.

pub mod gemini;
pub mod mock;
pub mod sse;

pub use gemini::{GeminiClient, GeminiError, DEFAULT_MODEL};
pub use mock::{MockChunk, MockScript};
