//! Two-hop connections through a relay host.
//!
//! The relay only forwards bytes over a `direct-tcpip` channel. The SSH
//! handshake and authentication with the target run end-to-end inside that
//! channel, so the relay never sees the target credential or the command.

use log::debug;

use super::auth::Authenticator;
use super::config::SshConfig;
use super::ssh::SshTransport;
use crate::error::Result;

impl SshTransport {
    /// Open a connection to `target` through this relay transport.
    ///
    /// Consumes the relay; it stays alive inside the returned transport and
    /// is closed after it.
    pub async fn tunnel(self, target: &SshConfig) -> Result<SshTransport> {
        let auth = Authenticator::resolve(&target.credential, &target.username).await?;
        self.tunnel_with(target, auth).await
    }

    /// Like [`tunnel`](Self::tunnel), with an already resolved credential.
    pub async fn tunnel_with(self, target: &SshConfig, auth: Authenticator) -> Result<SshTransport> {
        debug!(
            "opening tunnel to {} through {}",
            target.endpoint,
            self.endpoint()
        );

        let channel = self.open_direct_tcpip(&target.endpoint).await?;
        let stream = channel.into_stream();

        let mut inner = SshTransport::connect_over(stream, target, auth).await?;
        debug!("connected to {} via {}", inner.endpoint(), self.endpoint());

        inner.relay = Some(Box::new(self));
        Ok(inner)
    }
}
