//! SSH transport layer wrapping russh.
//!
//! This module provides the low-level SSH connection management:
//! credential resolution, host key pinning, direct connections and
//! connections tunneled through a relay host.

mod auth;
pub mod config;
pub mod known_hosts;
mod ssh;
mod tunnel;

pub use auth::Authenticator;
pub use config::{Credential, Endpoint, HostIdentityPolicy, SshConfig};
pub use ssh::SshTransport;
