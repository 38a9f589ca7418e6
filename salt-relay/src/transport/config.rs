//! SSH connection configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use russh::keys::PublicKey;
use secrecy::SecretString;

/// Network address of a relay or target host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Hostname or IP address.
    pub host: String,

    /// SSH port.
    pub port: u16,
}

impl Endpoint {
    /// Create an endpoint from a host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Error returned when an endpoint string is not `host` or `host:port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEndpointError;

impl FromStr for Endpoint {
    type Err = ParseEndpointError;

    /// Parse `host:port`; a bare `host` gets port 22.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (host, port) = match s.rsplit_once(':') {
            Some((host, port)) => (host, port.parse().map_err(|_| ParseEndpointError)?),
            None => (s, 22),
        };

        // Allow bracketed IPv6 literals like [::1]:22
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);

        if host.is_empty() || port == 0 {
            return Err(ParseEndpointError);
        }

        Ok(Self::new(host, port))
    }
}

/// Credential used to authenticate one connection.
///
/// Exactly one is active per connection attempt.
pub enum Credential {
    /// Private key material (OpenSSH or PEM text), held inline.
    Key(Vec<u8>),

    /// Path of an ssh-agent socket.
    AgentSocket(PathBuf),

    /// Password authentication.
    Password(SecretString),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(_) => f.write_str("Key(<redacted>)"),
            Self::AgentSocket(path) => f.debug_tuple("AgentSocket").field(path).finish(),
            Self::Password(_) => f.write_str("Password(<redacted>)"),
        }
    }
}

/// Rule for deciding whether to trust the server's host key.
#[derive(Debug, Clone)]
pub enum HostIdentityPolicy {
    /// Accept only this key, pinned from known_hosts.
    Verify(PublicKey),

    /// Accept any key.
    TrustAnyway,
}

/// SSH connection configuration for one hop.
#[derive(Debug)]
pub struct SshConfig {
    /// Where to connect.
    pub endpoint: Endpoint,

    /// Username for authentication.
    pub username: String,

    /// Credential for authentication.
    pub credential: Credential,

    /// Host key policy.
    pub host_identity: HostIdentityPolicy,
}

impl SshConfig {
    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        self.endpoint.to_string()
    }
}
