//! Server verification and client authentication.

use crate::error::map_ssh_error;
use russh::client::{AuthResult, Handle};
use russh::keys::ssh_key::{HashAlg, PublicKey};
use russh::keys::{PrivateKeyWithHashAlg, decode_secret_key};
use sftpbridge_core::config::RemoteConnectionConfig;
use sftpbridge_core::{BridgeError, BridgeResult};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ClientHandler {
    host: String,
    host_fingerprint: Option<String>,
}

impl ClientHandler {
    pub fn new(host: impl Into<String>, host_fingerprint: Option<String>) -> Self {
        Self {
            host: host.into(),
            host_fingerprint,
        }
    }
}

/// Returns true if the server key is acceptable.
///
/// Without a pinned fingerprint any key is accepted.
pub fn fingerprint_matches(expected: Option<&str>, actual: &str) -> bool {
    match expected {
        None => true,
        Some(expected) => expected.trim() == actual,
    }
}

impl russh::client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        let actual = server_public_key.fingerprint(HashAlg::Sha256).to_string();
        let accepted = fingerprint_matches(self.host_fingerprint.as_deref(), &actual);
        if !accepted {
            warn!("host key for {} does not match pinned fingerprint (got {actual})", self.host);
        }
        Ok(accepted)
    }
}

/// Authenticates with the private key if one is configured, then the password.
pub async fn authenticate(
    handle: &mut Handle<ClientHandler>,
    config: &RemoteConnectionConfig,
) -> BridgeResult<()> {
    if let Some(pem) = config.private_key.as_deref() {
        let key = decode_secret_key(pem, config.passphrase.as_deref()).map_err(|e| {
            BridgeError::Config(format!("invalid private key for {}: {e}", config.host))
        })?;
        let hash_alg = handle
            .best_supported_rsa_hash()
            .await
            .map_err(|e| map_ssh_error(e, "negotiating key hash"))?
            .flatten();
        let result = handle
            .authenticate_publickey(
                config.username.clone(),
                PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
            )
            .await
            .map_err(|e| map_ssh_error(e, "public key authentication"))?;
        if matches!(result, AuthResult::Success) {
            return Ok(());
        }
        debug!("public key rejected for {}@{}", config.username, config.host);
    }

    if let Some(password) = config.password.as_deref() {
        let result = handle
            .authenticate_password(config.username.clone(), password)
            .await
            .map_err(|e| map_ssh_error(e, "password authentication"))?;
        if matches!(result, AuthResult::Success) {
            return Ok(());
        }
    }

    Err(BridgeError::Remote(format!(
        "authentication failed for {}@{}",
        config.username, config.host
    )))
}
