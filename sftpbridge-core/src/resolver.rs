//! Resolves a stream's connection block into usable connection parameters.
//!
//! A private key may be stored in the object store and referenced from the
//! stream configuration by a `bucket/key` pointer. The resolver reads that
//! object and substitutes its contents as the literal key.

use crate::config::{RemoteConnectionConfig, StreamConfig};
use crate::error::{BridgeError, BridgeResult};
use crate::ports::ObjectStore;
use std::sync::Arc;
use tracing::debug;

pub struct ConnectionResolver {
    store: Arc<dyn ObjectStore>,
}

impl ConnectionResolver {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Produces connection parameters for `stream`.
    ///
    /// Fails with [`BridgeError::Config`] when the stream has no connection block.
    pub async fn resolve(&self, stream: &StreamConfig) -> BridgeResult<RemoteConnectionConfig> {
        let sftp = stream
            .sftp_config
            .as_ref()
            .ok_or_else(|| BridgeError::Config("SFTP config not found".to_string()))?;

        let mut resolved = RemoteConnectionConfig::from(sftp);

        if let Some(pointer) = sftp.s3_private_key.as_deref() {
            let (bucket, key) = split_pointer(pointer)?;
            let object = self
                .store
                .get_object(bucket, key)
                .await
                .map_err(|e| e.with_context(format!("reading private key {pointer}")))?;
            let private_key = String::from_utf8(object.body).map_err(|_| {
                BridgeError::Config(format!("private key at {pointer} is not valid UTF-8"))
            })?;
            resolved.private_key = Some(private_key);
            debug!("resolved private key for {} from object store", resolved.host);
        }

        Ok(resolved)
    }
}

/// Splits a `bucket/key` pointer at the first separator.
pub fn split_pointer(pointer: &str) -> BridgeResult<(&str, &str)> {
    match pointer.split_once('/') {
        Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok((bucket, key)),
        _ => Err(BridgeError::Config(format!(
            "private key pointer must be bucket/key, got {pointer}"
        ))),
    }
}
