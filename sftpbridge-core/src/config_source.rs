//! Stream configuration sources.

use crate::config::StreamConfigs;
use crate::error::{BridgeError, BridgeResult};
use crate::ports::{ConfigSource, ObjectStore};
use crate::types::InvocationContext;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Reads stream configuration from a JSON object in the object store.
///
/// The object lives in bucket `aws.lambda.<region>.<account-id>.config`
/// under key `<function-name>.json`.
pub struct ObjectStoreConfigSource {
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreConfigSource {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Bucket and key holding the configuration for `context`.
    pub fn config_location(context: &InvocationContext) -> (String, String) {
        (
            format!("aws.lambda.{}.{}.config", context.region, context.account_id),
            format!("{}.json", context.function_name),
        )
    }
}

#[async_trait]
impl ConfigSource for ObjectStoreConfigSource {
    async fn load(&self, context: &InvocationContext) -> BridgeResult<StreamConfigs> {
        let (bucket, key) = Self::config_location(context);
        let object = self
            .store
            .get_object(&bucket, &key)
            .await
            .map_err(|e| e.with_context(format!("loading config {bucket}/{key}")))?;
        let streams: StreamConfigs = serde_json::from_slice(&object.body).map_err(|e| {
            BridgeError::Config(format!("invalid stream configuration in {bucket}/{key}: {e}"))
        })?;
        debug!("loaded {} stream configs from {bucket}/{key}", streams.len());
        Ok(streams)
    }
}

/// A fixed stream configuration, e.g. read from a local file.
pub struct StaticConfigSource {
    streams: StreamConfigs,
}

impl StaticConfigSource {
    pub fn new(streams: StreamConfigs) -> Self {
        Self { streams }
    }

    pub fn from_json(json: &str) -> BridgeResult<Self> {
        let streams = serde_json::from_str(json)
            .map_err(|e| BridgeError::Config(format!("invalid stream configuration: {e}")))?;
        Ok(Self::new(streams))
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn load(&self, _context: &InvocationContext) -> BridgeResult<StreamConfigs> {
        Ok(self.streams.clone())
    }
}
