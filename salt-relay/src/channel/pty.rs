//! Pseudo-terminal request parameters for interactive sessions.

use russh::Pty;
use russh::Channel;
use russh::client::Msg;

/// Configuration for the PTY requested before an interactive command.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Terminal type reported to the server.
    pub term: String,

    /// Terminal width in columns.
    pub terminal_width: u32,

    /// Terminal height in rows.
    pub terminal_height: u32,

    /// Terminal modes (RFC 4254 opcodes and values).
    pub modes: Vec<(Pty, u32)>,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            term: "vt100".to_string(),
            terminal_width: 80,
            terminal_height: 40,
            modes: vec![
                (Pty::ECHO, 0),
                (Pty::TTY_OP_ISPEED, 14400),
                (Pty::TTY_OP_OSPEED, 14400),
                (Pty::IGNCR, 1),
            ],
        }
    }
}

impl PtyConfig {
    /// Request this PTY on an open session channel.
    pub async fn request(&self, channel: &Channel<Msg>) -> Result<(), russh::Error> {
        channel
            .request_pty(
                true,
                &self.term,
                self.terminal_width,
                self.terminal_height,
                0,
                0,
                &self.modes,
            )
            .await
    }
}
