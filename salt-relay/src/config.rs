//! JSON configuration file.

use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use secrecy::SecretString;
use serde::de::value::StringDeserializer;
use serde::de::IntoDeserializer;
use serde::{Deserialize, Deserializer};

use crate::command::Escalation;
use crate::error::{ConfigError, Result, TransportError};

/// Environment variable overriding the configuration path.
pub const CONFIG_ENV: &str = "SALT_RELAY_CONF";

/// Configuration file used when [`CONFIG_ENV`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "salt_relay.json";

/// How both hops authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Private key held inline in the configuration.
    Key,

    /// ssh-agent reached through `SSH_AUTH_SOCK`.
    Agent,

    /// Password.
    Password,

    /// Any other value; rejected when the hops are configured.
    #[serde(other)]
    Unknown,
}

/// Whether sudo asks for a password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SudoType {
    /// sudo prompts; `RemotePassword` answers it.
    Password,

    /// Passwordless sudo.
    NoPassword,

    /// Any other value; rejected only when `UseSudo` is set.
    #[serde(other)]
    Unknown,
}

/// Contents of the configuration file.
///
/// Every field is optional and defaults to its zero value. An empty `Auth`
/// or `SudoType` string reads as absent.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Configuration {
    #[serde(deserialize_with = "blank_as_none")]
    pub auth: Option<AuthMode>,
    pub use_jump: bool,
    pub use_sudo: bool,
    #[serde(deserialize_with = "blank_as_none")]
    pub sudo_type: Option<SudoType>,
    pub host_key_check: bool,
    pub jump_username: String,
    pub jump_password: String,
    pub jump_private_key: String,
    pub jump_server: String,
    pub remote_endpoint: String,
    pub remote_username: String,
    pub remote_password: String,
    pub remote_private_key: String,
}

fn blank_as_none<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(value) if !value.trim().is_empty() => {
            let value: StringDeserializer<D::Error> = value.into_deserializer();
            T::deserialize(value).map(Some)
        }
        _ => Ok(None),
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |s: &str| if s.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("Configuration")
            .field("auth", &self.auth)
            .field("use_jump", &self.use_jump)
            .field("use_sudo", &self.use_sudo)
            .field("sudo_type", &self.sudo_type)
            .field("host_key_check", &self.host_key_check)
            .field("jump_username", &self.jump_username)
            .field("jump_password", &redact(&self.jump_password))
            .field("jump_private_key", &redact(&self.jump_private_key))
            .field("jump_server", &self.jump_server)
            .field("remote_endpoint", &self.remote_endpoint)
            .field("remote_username", &self.remote_username)
            .field("remote_password", &redact(&self.remote_password))
            .field("remote_private_key", &redact(&self.remote_private_key))
            .finish()
    }
}

/// Environment variable read when [`CONFIG_ENV`] is unset.
pub const LEGACY_CONFIG_ENV: &str = "TABLESALTCONF";

/// Configuration file read when [`DEFAULT_CONFIG_FILE`] does not exist.
pub const LEGACY_CONFIG_FILE: &str = "ts_conf.json";

/// Path of the configuration file.
///
/// `$SALT_RELAY_CONF`, then `$TABLESALTCONF`, then `salt_relay.json` in the
/// working directory, then `ts_conf.json` if only that one exists.
pub fn config_path() -> PathBuf {
    resolve_config_path(
        |name| std::env::var_os(name).map(PathBuf::from),
        |path| path.exists(),
    )
}

fn resolve_config_path<E, X>(env: E, exists: X) -> PathBuf
where
    E: Fn(&str) -> Option<PathBuf>,
    X: Fn(&Path) -> bool,
{
    for name in [CONFIG_ENV, LEGACY_CONFIG_ENV] {
        if let Some(path) = env(name).filter(|p| !p.as_os_str().is_empty()) {
            return path;
        }
    }

    let default = PathBuf::from(DEFAULT_CONFIG_FILE);
    let legacy = PathBuf::from(LEGACY_CONFIG_FILE);
    if !exists(&default) && exists(&legacy) {
        debug!("using {}", LEGACY_CONFIG_FILE);
        return legacy;
    }
    default
}

impl Configuration {
    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Load the configuration at `path`.
    pub fn load(path: &Path) -> std::result::Result<Self, ConfigError> {
        let failure = |reason: String| ConfigError::ConfigLoadFailure {
            path: path.to_path_buf(),
            reason,
        };

        let text = std::fs::read_to_string(path).map_err(|e| failure(e.to_string()))?;
        let config = Self::from_json(&text).map_err(|e| failure(e.to_string()))?;
        debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load the configuration at `path`, falling back to the empty configuration.
    ///
    /// A missing or invalid file only warns; the empty configuration then
    /// fails later when authentication is resolved.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{}", e);
                Self::default()
            }
        }
    }

    /// Escalation mode for the remote command.
    ///
    /// Without a `SudoType` sudo is assumed to prompt.
    pub fn escalation(&self) -> Result<Escalation> {
        if !self.use_sudo {
            return Ok(Escalation::None);
        }

        match self.sudo_type {
            Some(SudoType::NoPassword) => Ok(Escalation::Sudo),
            Some(SudoType::Unknown) => Err(TransportError::AuthUnavailable {
                user: self.remote_username.clone(),
                reason: "unsupported SudoType".to_string(),
            }
            .into()),
            Some(SudoType::Password) | None => {
                if self.remote_password.is_empty() {
                    return Err(TransportError::AuthUnavailable {
                        user: self.remote_username.clone(),
                        reason: "sudo password mode selected but RemotePassword is empty"
                            .to_string(),
                    }
                    .into());
                }
                Ok(Escalation::SudoWithPassword(SecretString::from(
                    self.remote_password.clone(),
                )))
            }
        }
    }
}
