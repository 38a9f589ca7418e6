//! Streaming prompt detector for sudo password negotiation.
//!
//! The detector is a small state machine fed with raw remote output. It
//! decides when the escalation credential must be written and when the
//! command has finished, always matching against everything read so far.

use std::fmt;

use log::{debug, trace};
use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::channel::{PatternBuffer, PromptMatcher, completion_prompt, escalation_prompt};
use crate::error::{ChannelError, Result};

/// Size of each read from the remote stream.
const READ_CHUNK: usize = 1024;

/// Where the detector is in the interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptState {
    /// Waiting for sudo to ask for the password.
    AwaitingEscalationPrompt,

    /// Password sent; waiting for the shell prompt to come back.
    AwaitingCompletionPrompt,

    /// The command finished.
    Done,
}

impl fmt::Display for PromptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingEscalationPrompt => f.write_str("awaiting the password prompt"),
            Self::AwaitingCompletionPrompt => f.write_str("awaiting the shell prompt"),
            Self::Done => f.write_str("done"),
        }
    }
}

/// Action the caller must take after feeding output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorEvent {
    /// Write the escalation credential followed by a newline.
    InjectCredential,

    /// Stop reading; the transcript is complete.
    Finished,
}

/// State machine classifying remote output against two prompts.
pub struct PromptDetector {
    state: PromptState,
    buffer: PatternBuffer,
    escalation: Box<dyn PromptMatcher>,
    completion: Box<dyn PromptMatcher>,

    /// Buffer offset where the completion search starts (end of the
    /// escalation match), so a prompt printed before the command ran is
    /// never taken as completion.
    completion_from: usize,
}

impl PromptDetector {
    /// Create a detector from custom matchers.
    pub fn new(escalation: Box<dyn PromptMatcher>, completion: Box<dyn PromptMatcher>) -> Self {
        Self {
            state: PromptState::AwaitingEscalationPrompt,
            buffer: PatternBuffer::new(),
            escalation,
            completion,
            completion_from: 0,
        }
    }

    /// Create a detector with the sudo prompt and a shell prompt for `username`.
    pub fn for_user(username: &str) -> Result<Self> {
        let escalation = escalation_prompt().map_err(ChannelError::from)?;
        let completion = completion_prompt(username).map_err(ChannelError::from)?;
        Ok(Self::new(Box::new(escalation), Box::new(completion)))
    }

    /// Current state.
    pub fn state(&self) -> PromptState {
        self.state
    }

    /// Append output and advance the state machine.
    ///
    /// Returns an event when the caller has to act. Feeding after `Done`
    /// only records the bytes.
    pub fn feed(&mut self, data: &[u8]) -> Option<DetectorEvent> {
        self.buffer.extend(data);

        match self.state {
            PromptState::AwaitingEscalationPrompt => {
                let end = self.buffer.search_full(self.escalation.as_ref())?;
                trace!("escalation prompt matched at offset {}", end);
                self.completion_from = end;
                self.state = PromptState::AwaitingCompletionPrompt;
                Some(DetectorEvent::InjectCredential)
            }
            PromptState::AwaitingCompletionPrompt => {
                let end = self
                    .buffer
                    .search_from(self.completion_from, self.completion.as_ref())?;
                trace!("completion prompt matched at offset {}", end);
                self.state = PromptState::Done;
                Some(DetectorEvent::Finished)
            }
            PromptState::Done => None,
        }
    }

    /// Everything fed so far.
    pub fn transcript(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    /// Consume the detector, returning the full transcript.
    pub fn into_transcript(mut self) -> Vec<u8> {
        self.buffer.take()
    }

    /// Run the whole interaction over `stream`.
    ///
    /// Writes `command_line` terminated by a carriage return, answers the
    /// escalation prompt with `credential` and reads until the completion
    /// prompt. Returns the raw transcript.
    pub async fn drive<S>(
        &mut self,
        stream: &mut S,
        command_line: &str,
        credential: &SecretString,
    ) -> Result<Vec<u8>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        stream
            .write_all(format!("{}\r", command_line).as_bytes())
            .await
            .map_err(ChannelError::from)?;
        stream.flush().await.map_err(ChannelError::from)?;
        debug!("sent: {}", command_line);

        let mut chunk = [0u8; READ_CHUNK];
        while self.state != PromptState::Done {
            let n = match stream.read(&mut chunk).await {
                Ok(0) => return Err(self.incomplete()),
                Ok(n) => n,
                Err(e) => {
                    debug!("read failed {}: {}", self.state, e);
                    return Err(self.incomplete());
                }
            };
            trace!("received {} bytes, {} buffered", n, self.buffer.len());

            match self.feed(&chunk[..n]) {
                Some(DetectorEvent::InjectCredential) => {
                    stream
                        .write_all(credential.expose_secret().as_bytes())
                        .await
                        .map_err(ChannelError::from)?;
                    stream.write_all(b"\n").await.map_err(ChannelError::from)?;
                    stream.flush().await.map_err(ChannelError::from)?;
                    debug!("sent: ********");
                }
                Some(DetectorEvent::Finished) => break,
                None => {}
            }
        }

        Ok(self.buffer.as_slice().to_vec())
    }

    fn incomplete(&self) -> crate::error::Error {
        if self.buffer.is_empty() {
            debug!("remote closed without output");
        }
        ChannelError::IncompleteInteraction {
            state: self.state.to_string(),
        }
        .into()
    }
}
