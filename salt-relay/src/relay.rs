//! End-to-end relay of one command: configuration to response.
//!
//! Everything that can fail without touching the network (endpoint parsing,
//! host key pinning, credential resolution) is done before the first dial.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use secrecy::SecretString;

use crate::command::RemoteCommand;
use crate::config::{AuthMode, Configuration};
use crate::error::{ConfigError, Result, TransportError};
use crate::session::{Response, Session};
use crate::transport::known_hosts;
use crate::transport::{Authenticator, Credential, Endpoint, SshConfig, SshTransport};

/// Everything one invocation needs, built once in `main`.
#[derive(Debug)]
pub struct RelayContext {
    /// Parsed configuration file.
    pub config: Configuration,

    /// The command to run on the salt master.
    pub command: RemoteCommand,

    /// known_hosts file used when host key checking is on.
    pub known_hosts: Option<PathBuf>,

    /// ssh-agent socket used in agent mode.
    pub agent_socket: Option<PathBuf>,
}

/// One of the two possible connection hops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hop {
    /// The jump host.
    Jump,

    /// The salt master.
    Remote,
}

/// How the salt master is reached.
#[derive(Debug)]
pub enum Route {
    /// Dial the salt master directly.
    Direct { target: SshConfig },

    /// Dial the jump host, then tunnel to the salt master through it.
    ViaRelay { relay: SshConfig, target: SshConfig },
}

impl Route {
    /// The salt master hop.
    pub fn target(&self) -> &SshConfig {
        match self {
            Self::Direct { target } | Self::ViaRelay { target, .. } => target,
        }
    }
}

impl RelayContext {
    /// Create a context without known_hosts or agent locations.
    pub fn new(config: Configuration, command: RemoteCommand) -> Self {
        Self {
            config,
            command,
            known_hosts: None,
            agent_socket: None,
        }
    }

    /// Create a context taking known_hosts from `HOME` and the agent from `SSH_AUTH_SOCK`.
    pub fn from_env(config: Configuration, command: RemoteCommand) -> Self {
        Self {
            known_hosts: known_hosts::default_path(),
            agent_socket: std::env::var_os("SSH_AUTH_SOCK").map(PathBuf::from),
            ..Self::new(config, command)
        }
    }

    /// Use a specific known_hosts file.
    pub fn with_known_hosts(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts = Some(path.into());
        self
    }

    /// Use a specific ssh-agent socket.
    pub fn with_agent_socket(mut self, path: impl Into<PathBuf>) -> Self {
        self.agent_socket = Some(path.into());
        self
    }

    /// Connection settings for one hop.
    pub fn ssh_config(&self, hop: Hop) -> Result<SshConfig> {
        let config = &self.config;
        let (field, address, username, password, private_key) = match hop {
            Hop::Jump => (
                "JumpServer",
                &config.jump_server,
                &config.jump_username,
                &config.jump_password,
                &config.jump_private_key,
            ),
            Hop::Remote => (
                "RemoteEndpoint",
                &config.remote_endpoint,
                &config.remote_username,
                &config.remote_password,
                &config.remote_private_key,
            ),
        };

        let credential = match config.auth {
            Some(AuthMode::Key) => Credential::Key(private_key.as_bytes().to_vec()),
            Some(AuthMode::Agent) => {
                Credential::AgentSocket(self.agent_socket.clone().unwrap_or_default())
            }
            Some(AuthMode::Password) => Credential::Password(SecretString::from(password.clone())),
            Some(AuthMode::Unknown) => {
                return Err(TransportError::AuthUnavailable {
                    user: username.clone(),
                    reason: "unsupported Auth mode".to_string(),
                }
                .into());
            }
            None => {
                return Err(TransportError::AuthUnavailable {
                    user: username.clone(),
                    reason: "no Auth mode configured".to_string(),
                }
                .into());
            }
        };

        let endpoint: Endpoint = address.parse().map_err(|_| ConfigError::InvalidEndpoint {
            field,
            value: address.clone(),
        })?;

        let host_identity = known_hosts::resolve_policy(
            config.host_key_check,
            self.known_hosts.as_deref(),
            &endpoint.host,
        )?;

        Ok(SshConfig {
            endpoint,
            username: username.clone(),
            credential,
            host_identity,
        })
    }

    /// Decide how to reach the salt master.
    pub fn route(&self) -> Result<Route> {
        let target = self.ssh_config(Hop::Remote)?;
        if !self.config.use_jump {
            return Ok(Route::Direct { target });
        }

        let relay = self.ssh_config(Hop::Jump)?;
        Ok(Route::ViaRelay { relay, target })
    }
}

/// Connect along `ctx`'s route, run the command and disconnect.
pub async fn run(ctx: &RelayContext) -> Result<Response> {
    let route = ctx.route()?;

    let transport = match &route {
        Route::Direct { target } => {
            let auth = Authenticator::resolve(&target.credential, &target.username).await?;
            info!("connecting to {}", target.endpoint);
            SshTransport::connect_with(target, auth).await?
        }
        Route::ViaRelay { relay, target } => {
            let relay_auth = Authenticator::resolve(&relay.credential, &relay.username).await?;
            let target_auth = Authenticator::resolve(&target.credential, &target.username).await?;
            info!("connecting to {} via {}", target.endpoint, relay.endpoint);
            let outer = SshTransport::connect_with(relay, relay_auth).await?;
            outer.tunnel_with(target, target_auth).await?
        }
    };

    let result = Session::new(&transport).run(&ctx.command).await;

    if let Err(e) = transport.close().await {
        warn!("disconnect failed: {}", e);
    }

    let response = result?;
    debug!(
        "command finished in {:?}, {} lines of output",
        response.elapsed,
        response.lines().count()
    );
    if !response.is_success() {
        warn!("remote command exited with status {:?}", response.exit_status);
    }
    Ok(response)
}

/// Build the context from the configuration file and run `command`.
///
/// The command's escalation is taken from the configuration; a missing sudo
/// password fails here, before anything is dialed.
pub async fn run_with_config_file(path: &Path, command: RemoteCommand) -> Result<Response> {
    let config = Configuration::load_or_default(path);
    let escalation = config.escalation()?;
    let ctx = RelayContext::from_env(config, command.with_escalation(escalation));
    run(&ctx).await
}
