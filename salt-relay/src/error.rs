//! Error types for salt-relay.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Main error type for salt-relay operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel and interaction errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Transport layer errors (dial, handshake, authentication, host identity).
#[derive(Error, Debug)]
pub enum TransportError {
    /// The configured authentication mode has no usable material.
    #[error("No usable authentication for '{user}': {reason}")]
    AuthUnavailable { user: String, reason: String },

    /// No known_hosts entry contains the host name.
    #[error(
        "No host key for {host}. Host key checks can be disabled by setting HostKeyCheck to false"
    )]
    UnknownHost { host: String },

    /// The known_hosts entry for the host could not be parsed.
    #[error("Malformed host key for {host}: {reason}")]
    MalformedHostKey { host: String, reason: String },

    /// The known_hosts file could not be read.
    #[error("Cannot read known_hosts at {path}: {source}")]
    KnownHostsUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to open the TCP connection
    #[error("Connection failed to {host}:{port}: {source}")]
    DialFailure {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// The relay refused to open a forwarding channel to the target
    #[error("Relay could not reach {host}:{port}: {source}")]
    RelayDialFailure {
        host: String,
        port: u16,
        #[source]
        source: russh::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH handshake with {host}:{port} failed: {source}")]
    HandshakeFailure {
        host: String,
        port: u16,
        #[source]
        source: russh::Error,
    },

    /// The server presented a key other than the pinned one
    #[error("Host key for {host} does not match the known_hosts entry")]
    HostKeyMismatch { host: String },

    /// Authentication was rejected by the server
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH protocol error after the handshake
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),
}

/// Channel layer errors (session setup, prompt interaction).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Failed to open the channel or request PTY, shell or exec on it
    #[error("Failed to create session: {0}")]
    SessionCreateFailure(russh::Error),

    /// The remote stream ended before the interaction finished
    #[error("Remote output ended while {state}")]
    IncompleteInteraction { state: String },

    /// Reading or writing the remote stream failed
    #[error("I/O error on remote stream: {0}")]
    Io(#[from] io::Error),

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file is missing or not valid JSON
    #[error("Invalid or missing configuration at {path}: {reason}")]
    ConfigLoadFailure { path: PathBuf, reason: String },

    /// An endpoint field is not `host` or `host:port`
    #[error("Invalid endpoint '{value}' for {field}")]
    InvalidEndpoint { field: &'static str, value: String },
}

/// Result type alias using salt-relay's Error.
pub type Result<T> = std::result::Result<T, Error>;
