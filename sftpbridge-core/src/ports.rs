//! Traits for the external systems the engines talk to.

use crate::config::{RedeliveryPolicy, RemoteConnectionConfig, StreamConfigs};
use crate::error::BridgeResult;
use crate::types::{InvocationContext, QueueMessage, RemoteEntry, StoredObject};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Durable object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Reads an object's payload and user metadata.
    async fn get_object(&self, bucket: &str, key: &str) -> BridgeResult<StoredObject>;

    /// Writes an object, replacing any existing payload and metadata.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        metadata: HashMap<String, String>,
    ) -> BridgeResult<()>;

    /// Replaces an object's metadata without rewriting its payload.
    async fn replace_metadata(
        &self,
        bucket: &str,
        key: &str,
        metadata: HashMap<String, String>,
    ) -> BridgeResult<()>;
}

/// An open session against a remote file-transfer endpoint.
#[async_trait]
pub trait RemoteSession: Send + Sync {
    async fn list_dir(&self, path: &str) -> BridgeResult<Vec<RemoteEntry>>;

    async fn read_file(&self, path: &str) -> BridgeResult<Vec<u8>>;

    /// Writes `data` to `path`, truncating any existing file and creating
    /// missing parent directories.
    async fn write_file(&self, path: &str, data: &[u8]) -> BridgeResult<()>;

    async fn remove_file(&self, path: &str) -> BridgeResult<()>;

    /// Moves `from` to `to`, replacing `to` and creating its parent directories.
    async fn rename(&self, from: &str, to: &str) -> BridgeResult<()>;

    async fn close(&self) -> BridgeResult<()>;
}

/// Opens remote sessions.
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    async fn connect(
        &self,
        config: &RemoteConnectionConfig,
    ) -> BridgeResult<Arc<dyn RemoteSession>>;
}

/// Durable at-least-once queue holding notifications to retry.
#[async_trait]
pub trait RetryQueue: Send + Sync {
    /// Enqueues `body`, returning the queue-assigned message id if any.
    async fn send(&self, body: String) -> BridgeResult<Option<String>>;

    async fn receive(
        &self,
        max_messages: i32,
        policy: &RedeliveryPolicy,
    ) -> BridgeResult<Vec<QueueMessage>>;

    async fn delete(&self, receipt_handle: &str) -> BridgeResult<()>;
}

/// Supplies the stream configuration for an invocation.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn load(&self, context: &InvocationContext) -> BridgeResult<StreamConfigs>;
}
