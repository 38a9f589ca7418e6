//! Credential resolution and SSH user authentication.

use std::sync::Arc;

use log::debug;
use russh::client::{self, Handle};
use russh::keys::{PrivateKey, PrivateKeyWithHashAlg, decode_secret_key};
use secrecy::{ExposeSecret, SecretString};

#[cfg(unix)]
use russh::keys::agent::client::AgentClient;
#[cfg(unix)]
use tokio::net::UnixStream;

use super::config::Credential;
use crate::error::{Result, TransportError};

/// A credential resolved into a usable authentication method.
///
/// Resolution happens before any network dial, so a configuration without
/// usable material fails early with `AuthUnavailable`.
pub enum Authenticator {
    /// Password authentication.
    Password(SecretString),

    /// Decoded private key.
    Key(Arc<PrivateKey>),

    /// Connected ssh-agent.
    #[cfg(unix)]
    Agent(AgentClient<UnixStream>),
}

impl Authenticator {
    /// Resolve `credential` for `user`.
    pub async fn resolve(credential: &Credential, user: &str) -> Result<Self> {
        let unavailable = |reason: &str| TransportError::AuthUnavailable {
            user: user.to_string(),
            reason: reason.to_string(),
        };

        match credential {
            Credential::Password(password) => {
                if password.expose_secret().is_empty() {
                    return Err(unavailable("password authentication selected but no password set").into());
                }
                Ok(Self::Password(SecretString::from(
                    password.expose_secret().to_string(),
                )))
            }
            Credential::Key(material) => {
                let text = std::str::from_utf8(material)
                    .map_err(|_| unavailable("private key is not valid text"))?;
                if text.trim().is_empty() {
                    return Err(unavailable("key authentication selected but no private key set").into());
                }
                let key = decode_secret_key(text, None).map_err(|e| {
                    debug!("private key decode failed: {}", e);
                    unavailable("could not parse private key; check it is not encrypted")
                })?;
                Ok(Self::Key(Arc::new(key)))
            }
            #[cfg(unix)]
            Credential::AgentSocket(path) => {
                if path.as_os_str().is_empty() {
                    return Err(unavailable("agent authentication selected but SSH_AUTH_SOCK is not set").into());
                }
                let agent = AgentClient::connect_uds(path).await.map_err(|e| {
                    debug!("agent connect to {} failed: {}", path.display(), e);
                    unavailable("ssh-agent socket is not reachable")
                })?;
                Ok(Self::Agent(agent))
            }
            #[cfg(not(unix))]
            Credential::AgentSocket(_) => {
                Err(unavailable("agent authentication is not supported on this platform").into())
            }
        }
    }

    /// Authenticate `user` on an established session.
    pub(crate) async fn authenticate<H>(self, session: &mut Handle<H>, user: &str) -> Result<()>
    where
        H: client::Handler,
    {
        let success = match self {
            Self::Password(password) => session
                .authenticate_password(user, password.expose_secret())
                .await
                .map_err(TransportError::Ssh)?
                .success(),
            Self::Key(key) => {
                // Get the best RSA hash algorithm supported by the server
                let hash_alg = session
                    .best_supported_rsa_hash()
                    .await
                    .map_err(TransportError::Ssh)?
                    .flatten();

                session
                    .authenticate_publickey(user, PrivateKeyWithHashAlg::new(key, hash_alg))
                    .await
                    .map_err(TransportError::Ssh)?
                    .success()
            }
            #[cfg(unix)]
            Self::Agent(mut agent) => {
                let keys = agent.request_identities().await.map_err(|e| {
                    debug!("agent identity listing failed: {}", e);
                    TransportError::AuthUnavailable {
                        user: user.to_string(),
                        reason: "ssh-agent did not list identities".to_string(),
                    }
                })?;

                let mut accepted = false;
                for key in keys {
                    match session
                        .authenticate_publickey_with(user, key, None, &mut agent)
                        .await
                    {
                        Ok(result) if result.success() => {
                            accepted = true;
                            break;
                        }
                        _ => continue,
                    }
                }
                accepted
            }
        };

        if !success {
            return Err(TransportError::AuthenticationFailed {
                user: user.to_string(),
            }
            .into());
        }

        Ok(())
    }
}
