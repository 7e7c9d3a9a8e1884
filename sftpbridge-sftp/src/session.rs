//! An authenticated SFTP subsystem channel.

use crate::auth::ClientHandler;
use crate::error::{is_missing_path, map_sftp_error};
use crate::paths::{ancestor_dirs, mtime_to_datetime};
use async_trait::async_trait;
use russh::Disconnect;
use russh::client::Handle;
use russh_sftp::client::SftpSession;
use sftpbridge_core::ports::RemoteSession;
use sftpbridge_core::{BridgeError, BridgeResult, RemoteEntry};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::debug;

pub struct SftpRemoteSession {
    handle: Mutex<Handle<ClientHandler>>,
    sftp: SftpSession,
}

impl SftpRemoteSession {
    pub(crate) fn new(handle: Handle<ClientHandler>, sftp: SftpSession) -> Self {
        Self {
            handle: Mutex::new(handle),
            sftp,
        }
    }

    /// Creates every missing parent directory of `path`.
    async fn ensure_parent_dirs(&self, path: &str) -> BridgeResult<()> {
        for dir in ancestor_dirs(path) {
            match self.sftp.metadata(&dir).await {
                Ok(meta) if meta.is_dir() => {}
                Ok(_) => {
                    return Err(BridgeError::Remote(format!(
                        "remote path exists but is not a directory: {dir}"
                    )));
                }
                Err(e) if is_missing_path(&e) => {
                    debug!("creating remote directory {dir}");
                    self.sftp
                        .create_dir(&dir)
                        .await
                        .map_err(|e| map_sftp_error(e, &format!("mkdir {dir}")))?;
                }
                Err(e) => return Err(map_sftp_error(e, &format!("stat {dir}"))),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteSession for SftpRemoteSession {
    async fn list_dir(&self, path: &str) -> BridgeResult<Vec<RemoteEntry>> {
        let listing = self
            .sftp
            .read_dir(path)
            .await
            .map_err(|e| map_sftp_error(e, &format!("list {path}")))?;

        Ok(listing
            .map(|entry| {
                let meta = entry.metadata();
                RemoteEntry {
                    name: entry.file_name(),
                    is_dir: meta.is_dir(),
                    modified: mtime_to_datetime(meta.mtime),
                    size: meta.size,
                    permissions: meta.permissions,
                }
            })
            .collect())
    }

    async fn read_file(&self, path: &str) -> BridgeResult<Vec<u8>> {
        let mut file = self
            .sftp
            .open(path)
            .await
            .map_err(|e| map_sftp_error(e, &format!("open {path}")))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .await
            .map_err(|e| BridgeError::Remote(format!("read {path}: {e}")))?;
        debug!("read {} bytes from {path}", data.len());
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> BridgeResult<()> {
        self.ensure_parent_dirs(path).await?;
        let mut file = self
            .sftp
            .create(path)
            .await
            .map_err(|e| map_sftp_error(e, &format!("create {path}")))?;
        file.write_all(data)
            .await
            .map_err(|e| BridgeError::Remote(format!("write {path}: {e}")))?;
        file.flush()
            .await
            .map_err(|e| BridgeError::Remote(format!("flush {path}: {e}")))?;
        file.shutdown()
            .await
            .map_err(|e| BridgeError::Remote(format!("close {path}: {e}")))?;
        debug!("wrote {} bytes to {path}", data.len());
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> BridgeResult<()> {
        self.sftp
            .remove_file(path)
            .await
            .map_err(|e| map_sftp_error(e, &format!("remove {path}")))
    }

    async fn rename(&self, from: &str, to: &str) -> BridgeResult<()> {
        self.ensure_parent_dirs(to).await?;
        // SFTP v3 rename refuses to replace an existing target.
        if self
            .sftp
            .try_exists(to)
            .await
            .map_err(|e| map_sftp_error(e, &format!("stat {to}")))?
        {
            self.remove_file(to).await?;
        }
        self.sftp
            .rename(from, to)
            .await
            .map_err(|e| map_sftp_error(e, &format!("rename {from} -> {to}")))
    }

    async fn close(&self) -> BridgeResult<()> {
        self.sftp
            .close()
            .await
            .map_err(|e| map_sftp_error(e, "closing sftp channel"))?;
        self.handle
            .lock()
            .await
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(|e| BridgeError::Remote(format!("disconnect: {e}")))
    }
}
