//! Command execution over an established transport.
//!
//! A [`Session`] runs one [`RemoteCommand`] on its own channel. Commands
//! that need a sudo password run on a PTY shell driven by the
//! [`PromptDetector`]; everything else uses a plain `exec` request.

mod detector;
mod response;
mod sanitize;

pub use detector::{DetectorEvent, PromptDetector, PromptState};
pub use response::Response;
pub use sanitize::{OutputMode, sanitize};

use std::time::Instant;

use log::{debug, trace};
use russh::client::Msg;
use russh::{Channel, ChannelMsg};
use secrecy::SecretString;
use tokio::io::AsyncWriteExt;

use crate::channel::PtyConfig;
use crate::command::{Escalation, RemoteCommand};
use crate::error::{ChannelError, Result};
use crate::transport::SshTransport;

/// One command invocation on a transport.
pub struct Session<'a> {
    transport: &'a SshTransport,
    pty: PtyConfig,
}

impl<'a> Session<'a> {
    /// Create a session on `transport` with the default PTY settings.
    pub fn new(transport: &'a SshTransport) -> Self {
        Self {
            transport,
            pty: PtyConfig::default(),
        }
    }

    /// Override the PTY requested for interactive commands.
    pub fn with_pty(mut self, pty: PtyConfig) -> Self {
        self.pty = pty;
        self
    }

    /// Run `command` and return its sanitized output.
    pub async fn run(&self, command: &RemoteCommand) -> Result<Response> {
        let line = command.line();
        let start = Instant::now();

        let (raw, exit_status) = match command.escalation() {
            Escalation::SudoWithPassword(password) => {
                (self.run_interactive(&line, password).await?, None)
            }
            Escalation::None | Escalation::Sudo => self.run_batch(&line).await?,
        };

        let raw = String::from_utf8_lossy(&raw).into_owned();
        let mode = if command.is_interactive() {
            OutputMode::Interactive {
                username: self.transport.username(),
                command: &line,
            }
        } else {
            OutputMode::Batch
        };
        let result = sanitize(&raw, &mode);

        Ok(Response::new(line.as_str(), result, raw, exit_status, start.elapsed()))
    }

    /// Execute on a plain channel, collecting stdout until the command ends.
    async fn run_batch(&self, line: &str) -> Result<(Vec<u8>, Option<u32>)> {
        let mut channel = self.transport.open_session().await?;

        if let Err(e) = channel.exec(true, line).await {
            channel.close().await.ok();
            return Err(ChannelError::SessionCreateFailure(e).into());
        }
        debug!("exec: {}", line);

        let output = collect_output(&mut channel).await;
        channel.close().await.ok();
        output.map_err(|e| ChannelError::SessionCreateFailure(e).into())
    }

    /// Execute on a PTY shell, answering the sudo password prompt.
    async fn run_interactive(&self, line: &str, password: &SecretString) -> Result<Vec<u8>> {
        let mut detector = PromptDetector::for_user(self.transport.username())?;
        let mut channel = self.transport.open_session().await?;

        if let Err(e) = self.start_shell(&mut channel).await {
            channel.close().await.ok();
            return Err(ChannelError::SessionCreateFailure(e).into());
        }
        debug!("shell started on {}", self.transport.endpoint());

        // Dropping the stream closes the channel
        let mut stream = channel.into_stream();
        let result = detector.drive(&mut stream, line, password).await;
        stream.shutdown().await.ok();

        result
    }

    /// Request the PTY, then the shell, each confirmed by the server.
    async fn start_shell(
        &self,
        channel: &mut Channel<Msg>,
    ) -> std::result::Result<(), russh::Error> {
        self.pty.request(channel).await?;
        await_reply(channel, "pty-req").await?;
        channel.request_shell(true).await?;
        await_reply(channel, "shell").await
    }
}

/// Wait for the server's answer to the last channel request.
///
/// Output arriving before the answer belongs to no command yet and is dropped.
async fn await_reply(
    channel: &mut Channel<Msg>,
    request: &str,
) -> std::result::Result<(), russh::Error> {
    loop {
        match channel.wait().await {
            Some(ChannelMsg::Success) => {
                trace!("{} accepted", request);
                return Ok(());
            }
            Some(ChannelMsg::Failure) => {
                debug!("{} rejected", request);
                return Err(russh::Error::RequestDenied);
            }
            Some(ChannelMsg::Close) | None => return Err(russh::Error::Disconnect),
            Some(ChannelMsg::Data { data }) => {
                trace!("dropped {} bytes before {} reply", data.len(), request);
            }
            Some(_) => {}
        }
    }
}

/// Read channel messages until close, or until both EOF and an exit status arrived.
///
/// Fails if the server rejects the `exec` request.
async fn collect_output(
    channel: &mut Channel<Msg>,
) -> std::result::Result<(Vec<u8>, Option<u32>), russh::Error> {
    let mut stdout = Vec::new();
    let mut exit_status = None;
    let mut got_eof = false;

    loop {
        match channel.wait().await {
            Some(ChannelMsg::Data { data }) => {
                trace!("received {} bytes", data.len());
                stdout.extend_from_slice(&data);
            }
            Some(ChannelMsg::ExitStatus { exit_status: status }) => {
                exit_status = Some(status);
                if got_eof {
                    break;
                }
            }
            Some(ChannelMsg::Eof) => {
                got_eof = true;
                if exit_status.is_some() {
                    break;
                }
            }
            Some(ChannelMsg::Failure) => {
                debug!("exec rejected");
                return Err(russh::Error::RequestDenied);
            }
            Some(ChannelMsg::Close) | None => break,
            Some(_) => {}
        }
    }

    Ok((stdout, exit_status))
}
