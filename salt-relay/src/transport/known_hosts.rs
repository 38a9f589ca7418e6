//! Host key pinning from a known_hosts file.
//!
//! The lookup is loose: the first line whose host field
//! *contains* the target host name wins. Hashed entries never match.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::debug;
use russh::keys::PublicKey;

use super::config::HostIdentityPolicy;
use crate::error::{Result, TransportError};

/// Default known_hosts location under `$HOME`.
pub fn default_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".ssh").join("known_hosts"))
}

/// Build the host identity policy for `host`.
///
/// With `check` disabled this is [`HostIdentityPolicy::TrustAnyway`] and the
/// file is never touched.
pub fn resolve_policy(check: bool, path: Option<&Path>, host: &str) -> Result<HostIdentityPolicy> {
    if !check {
        return Ok(HostIdentityPolicy::TrustAnyway);
    }

    let path = path.ok_or_else(|| TransportError::UnknownHost {
        host: host.to_string(),
    })?;
    let key = pinned_key(path, host)?;
    Ok(HostIdentityPolicy::Verify(key))
}

/// Read `path` and pin the key of the first entry matching `host`.
pub fn pinned_key(path: &Path, host: &str) -> Result<PublicKey> {
    let file = File::open(path).map_err(|source| TransportError::KnownHostsUnreadable {
        path: path.to_path_buf(),
        source,
    })?;

    find_host_key(BufReader::new(file), host)
}

/// Scan known_hosts lines for the first entry whose host field contains `host`.
pub fn find_host_key(reader: impl BufRead, host: &str) -> Result<PublicKey> {
    // Stop at the first unreadable line
    for line in reader.lines().map_while(|line| line.ok()) {
        let fields: Vec<&str> = line.split(' ').collect();
        if fields.len() != 3 {
            continue;
        }

        if fields[0].contains(host) {
            debug!("known_hosts entry '{}' selected for {}", fields[0], host);
            let openssh = format!("{} {}", fields[1], fields[2]);
            return PublicKey::from_openssh(&openssh).map_err(|e| {
                TransportError::MalformedHostKey {
                    host: host.to_string(),
                    reason: e.to_string(),
                }
                .into()
            });
        }
    }

    Err(TransportError::UnknownHost {
        host: host.to_string(),
    }
    .into())
}
