//! SSH transport implementation using russh.

use std::sync::{Arc, Mutex};

use log::{debug, warn};
use russh::Channel;
use russh::client::{self, Handle, Msg};
use russh::keys::PublicKey;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use super::auth::Authenticator;
use super::config::{Endpoint, HostIdentityPolicy, SshConfig};
use crate::error::{ChannelError, Result, TransportError};

/// SSH transport wrapping a russh client connection.
///
/// A transport created by [`SshTransport::tunnel`] owns the relay transport
/// it rides on. Fields drop in declaration order, so the inner session is
/// always torn down before the relay.
pub struct SshTransport {
    /// The russh session handle.
    session: Handle<SshHandler>,

    /// Where this transport is connected.
    endpoint: Endpoint,

    /// Authenticated user.
    username: String,

    /// Relay transport carrying this connection, if tunneled.
    pub(super) relay: Option<Box<SshTransport>>,
}

impl SshTransport {
    /// Resolve the credential, dial the endpoint and authenticate.
    pub async fn connect(config: &SshConfig) -> Result<Self> {
        let auth = Authenticator::resolve(&config.credential, &config.username).await?;
        Self::connect_with(config, auth).await
    }

    /// Dial the endpoint and authenticate with an already resolved credential.
    pub async fn connect_with(config: &SshConfig, auth: Authenticator) -> Result<Self> {
        let endpoint = &config.endpoint;
        debug!("dialing {}", config.socket_addr());

        let stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port))
            .await
            .map_err(|source| TransportError::DialFailure {
                host: endpoint.host.clone(),
                port: endpoint.port,
                source,
            })?;
        stream.set_nodelay(true).ok();

        Self::connect_over(stream, config, auth).await
    }

    /// Run the SSH handshake and authentication over an existing byte stream.
    ///
    /// The stream can be a TCP socket or a forwarding channel opened on a
    /// relay; either way the handshake is end-to-end with the target.
    pub async fn connect_over<S>(stream: S, config: &SshConfig, auth: Authenticator) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let ssh_config = Arc::new(client::Config::default());

        let host_key_error: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: config.endpoint.host.clone(),
            host_identity: config.host_identity.clone(),
            host_key_error: host_key_error.clone(),
        };

        let mut session = client::connect_stream(ssh_config, stream, handler)
            .await
            .map_err(|source| {
                // If check_server_key stored a detailed error, use that instead
                // of the generic russh::Error::UnknownKey
                let stored = host_key_error.lock().ok().and_then(|mut slot| slot.take());
                stored.unwrap_or_else(|| TransportError::HandshakeFailure {
                    host: config.endpoint.host.clone(),
                    port: config.endpoint.port,
                    source,
                })
            })?;

        auth.authenticate(&mut session, &config.username).await?;
        debug!("authenticated to {} as {}", config.endpoint, config.username);

        Ok(Self {
            session,
            endpoint: config.endpoint.clone(),
            username: config.username.clone(),
            relay: None,
        })
    }

    /// Open a new session channel on this connection.
    pub async fn open_session(&self) -> Result<Channel<Msg>> {
        self.session
            .channel_open_session()
            .await
            .map_err(|e| ChannelError::SessionCreateFailure(e).into())
    }

    /// Open a raw `direct-tcpip` forwarding channel to `target`.
    pub(super) async fn open_direct_tcpip(&self, target: &Endpoint) -> Result<Channel<Msg>> {
        self.session
            .channel_open_direct_tcpip(target.host.as_str(), u32::from(target.port), "127.0.0.1", 0)
            .await
            .map_err(|source| {
                TransportError::RelayDialFailure {
                    host: target.host.clone(),
                    port: target.port,
                    source,
                }
                .into()
            })
    }

    /// The endpoint this transport is connected to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// The authenticated username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The relay this transport is tunneled through, if any.
    pub fn relay(&self) -> Option<&SshTransport> {
        self.relay.as_deref()
    }

    /// Close the connection, then the relay connection beneath it.
    pub async fn close(self) -> Result<()> {
        let Self {
            session,
            endpoint,
            relay,
            ..
        } = self;

        let result = session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await;
        drop(session);

        if let Some(relay) = relay {
            if let Err(e) = Box::pin(relay.close()).await {
                warn!("closing relay under {} failed: {}", endpoint, e);
            }
        }

        result.map_err(TransportError::Ssh)?;
        Ok(())
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    host_identity: HostIdentityPolicy,
    /// Stores a detailed host-key error so connect_over() can surface it
    /// instead of the generic russh::Error::UnknownKey.
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match &self.host_identity {
            HostIdentityPolicy::TrustAnyway => {
                debug!("accepting host key for {} without verification", self.host);
                Ok(true)
            }
            HostIdentityPolicy::Verify(pinned) => {
                if pinned.key_data() == server_public_key.key_data() {
                    return Ok(true);
                }

                warn!("host key for {} does not match the pinned key", self.host);
                if let Ok(mut slot) = self.host_key_error.lock() {
                    *slot = Some(TransportError::HostKeyMismatch {
                        host: self.host.clone(),
                    });
                }
                Ok(false)
            }
        }
    }
}
