//! Opens SFTP sessions over SSH.

use crate::auth::{ClientHandler, authenticate};
use crate::error::{map_sftp_error, map_ssh_error};
use crate::session::SftpRemoteSession;
use async_trait::async_trait;
use russh_sftp::client::SftpSession;
use sftpbridge_core::config::RemoteConnectionConfig;
use sftpbridge_core::ports::{RemoteConnector, RemoteSession};
use sftpbridge_core::{BridgeError, BridgeResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SftpSettings {
    /// Upper bound on TCP connect plus SSH handshake.
    pub connect_timeout: Duration,

    /// Idle time after which the SSH connection is dropped.
    pub inactivity_timeout: Duration,
}

impl Default for SftpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            inactivity_timeout: Duration::from_secs(60),
        }
    }
}

pub struct SftpConnector {
    settings: SftpSettings,
    ssh_config: Arc<russh::client::Config>,
}

impl SftpConnector {
    pub fn new(settings: SftpSettings) -> Self {
        let ssh_config = russh::client::Config {
            inactivity_timeout: Some(settings.inactivity_timeout),
            ..Default::default()
        };
        Self {
            settings,
            ssh_config: Arc::new(ssh_config),
        }
    }
}

impl Default for SftpConnector {
    fn default() -> Self {
        Self::new(SftpSettings::default())
    }
}

/// Rejects connection parameters that cannot possibly connect.
pub fn validate(config: &RemoteConnectionConfig) -> BridgeResult<()> {
    if config.host.trim().is_empty() {
        return Err(BridgeError::Config("SFTP host is empty".to_string()));
    }
    if config.username.trim().is_empty() {
        return Err(BridgeError::Config(format!(
            "SFTP username is empty for {}",
            config.host
        )));
    }
    if config.password.is_none() && config.private_key.is_none() {
        return Err(BridgeError::Config(format!(
            "no password or private key configured for {}",
            config.host
        )));
    }
    Ok(())
}

#[async_trait]
impl RemoteConnector for SftpConnector {
    async fn connect(
        &self,
        config: &RemoteConnectionConfig,
    ) -> BridgeResult<Arc<dyn RemoteSession>> {
        validate(config)?;
        let target = format!("{}:{}", config.host, config.port);

        let handler = ClientHandler::new(config.host.clone(), config.host_fingerprint.clone());
        let connecting = russh::client::connect(
            Arc::clone(&self.ssh_config),
            (config.host.clone(), config.port),
            handler,
        );
        let mut handle = timeout(self.settings.connect_timeout, connecting)
            .await
            .map_err(|_| BridgeError::Timeout(format!("connecting to {target}")))?
            .map_err(|e| map_ssh_error(e, &format!("connecting to {target}")))?;

        authenticate(&mut handle, config).await?;
        info!("connected to {}@{target}", config.username);

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| map_ssh_error(e, "opening session channel"))?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| map_ssh_error(e, "requesting sftp subsystem"))?;
        let sftp = SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| map_sftp_error(e, "starting sftp session"))?;

        Ok(Arc::new(SftpRemoteSession::new(handle, sftp)))
    }
}
