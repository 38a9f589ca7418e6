//! Channel layer for prompt matching and PTY settings.
//!
//! This module holds the pieces the interactive session is built from:
//! the cumulative output buffer, the prompt classifiers and the
//! pseudo-terminal request parameters.

mod buffer;
mod patterns;
mod pty;

pub use buffer::PatternBuffer;
pub(crate) use patterns::ESCALATION_PHRASE;
pub use patterns::{PromptMatcher, completion_prompt, escalation_prompt};
pub use pty::PtyConfig;
