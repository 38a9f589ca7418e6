//! Pattern matching utilities for prompt detection.

use regex::bytes::Regex;

/// Trait for prompt matching - regex by default, extensible for custom parsers.
///
/// The prompt detector only talks to this trait, so a classifier that
/// understands terminal control sequences can replace the regexes without
/// touching the session code.
pub trait PromptMatcher: Send + Sync {
    /// Returns byte offset where match ends, or None if no match.
    fn find_match(&self, data: &[u8]) -> Option<usize>;

    /// Check if the data matches the pattern.
    fn is_match(&self, data: &[u8]) -> bool {
        self.find_match(data).is_some()
    }
}

/// Regex-based prompt matcher (the default implementation).
impl PromptMatcher for Regex {
    fn find_match(&self, data: &[u8]) -> Option<usize> {
        self.find(data).map(|m| m.end())
    }
}

/// Phrase sudo uses when asking for a password, e.g. `[sudo] password for alice:`.
pub(crate) const ESCALATION_PHRASE: &str = "password for";

/// The privilege escalation prompt. Case-sensitive.
pub fn escalation_prompt() -> Result<Regex, regex::Error> {
    Regex::new(&regex::escape(ESCALATION_PHRASE))
}

/// The shell prompt that signals the command finished: the username
/// followed, later on the same line, by `$`, `#` or `>`.
pub fn completion_prompt(username: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"(?-u){}.*[$#>]", regex::escape(username)))
}
