//! # salt-relay
//!
//! Run salt commands on a remote salt master over SSH.
//!
//! salt-relay connects to the master directly or through a jump host,
//! runs `salt`, `salt-run`, `salt-key` or an arbitrary command there and
//! returns the cleaned output. When sudo asks for a password the command
//! runs on a PTY and the password prompt is answered automatically.
//!
//! ## Features
//!
//! - Async SSH connections via russh
//! - Jump host tunnels with end-to-end encryption to the master
//! - Key, ssh-agent and password authentication
//! - Host key pinning from known_hosts
//! - Streaming sudo prompt detection over a cumulative buffer
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use salt_relay::command::{Program, RemoteCommand};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), salt_relay::Error> {
//!     let command = RemoteCommand::new(
//!         Program::Salt,
//!         vec!["*".to_string(), "test.ping".to_string()],
//!     );
//!
//!     let response =
//!         salt_relay::relay::run_with_config_file(Path::new("salt_relay.json"), command).await?;
//!     println!("{}", response.result);
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod command;
pub mod config;
pub mod error;
pub mod relay;
pub mod session;
pub mod transport;

// Re-export main types for convenience
pub use command::{Escalation, Program, RemoteCommand};
pub use config::Configuration;
pub use error::Error;
pub use relay::RelayContext;
pub use session::{Response, Session};
pub use transport::{SshConfig, SshTransport};
