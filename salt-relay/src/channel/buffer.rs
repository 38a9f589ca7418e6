//! Cumulative output buffer for prompt detection.
//!
//! Remote shells emit output at arbitrary chunk boundaries, so a prompt can
//! arrive split across two reads. Patterns are therefore always matched
//! against everything accumulated so far, never against a single chunk.

use bytes::BytesMut;

use super::patterns::PromptMatcher;

/// Buffer for accumulating remote output and searching it for prompts.
///
/// Bytes are never discarded; the whole transcript is kept so it can be
/// handed to the sanitizer once the interaction is done.
#[derive(Debug, Default)]
pub struct PatternBuffer {
    /// The accumulated output.
    buffer: BytesMut,
}

impl PatternBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Append newly read bytes.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Search the region starting at byte `start` for a prompt.
    ///
    /// Returns the match end as an offset into the full buffer.
    pub fn search_from(&self, start: usize, matcher: &dyn PromptMatcher) -> Option<usize> {
        let start = start.min(self.buffer.len());
        matcher
            .find_match(&self.buffer[start..])
            .map(|end| start + end)
    }

    /// Search the entire buffer for a prompt.
    pub fn search_full(&self, matcher: &dyn PromptMatcher) -> Option<usize> {
        self.search_from(0, matcher)
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        self.buffer.split().to_vec()
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
