//! Store → remote dispatch for storage-change notifications.
//!
//! Per changed object: read it, skip if already delivered, write it to every
//! stream whose store location is a segment prefix of the object's path, and
//! only then flip the delivered flag. Any failed write aborts before the flag
//! is set, so a replay re-attempts every matched stream; remote writes
//! overwrite and tolerate repetition.

use crate::config::{StreamConfig, StreamConfigs};
use crate::error::BridgeResult;
use crate::path;
use crate::ports::{ObjectStore, RemoteConnector};
use crate::resolver::ConnectionResolver;
use crate::session::with_session;
use crate::types::{DELIVERED_METADATA_KEY, NotificationRecord, Outcome, StorageNotification};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Streams whose store location is a whole-segment prefix of `object_path`.
///
/// `object_path` is `bucket/key`. Streams without a store location never match.
pub fn matching_streams<'a>(
    streams: &'a StreamConfigs,
    object_path: &str,
) -> Vec<(&'a str, &'a StreamConfig)> {
    streams
        .iter()
        .filter(|(_, stream)| {
            stream
                .store_location()
                .is_some_and(|location| path::is_segment_prefix(&location.full_path(), object_path))
        })
        .map(|(name, stream)| (name.as_str(), stream))
        .collect()
}

/// Remote path for `object_path` delivered through `stream`.
///
/// Strips the stream's store-location segments from the object path and
/// re-roots the remainder under the stream's remote directory.
pub fn remote_destination(stream: &StreamConfig, object_path: &str) -> String {
    let store_root = stream.s3_location.as_deref().unwrap_or_default();
    let remote_root = stream.sftp_location.as_deref().unwrap_or_default();
    path::map_destination(store_root, object_path, remote_root)
}

pub struct PushDispatchEngine {
    store: Arc<dyn ObjectStore>,
    connector: Arc<dyn RemoteConnector>,
    resolver: ConnectionResolver,
}

impl PushDispatchEngine {
    pub fn new(store: Arc<dyn ObjectStore>, connector: Arc<dyn RemoteConnector>) -> Self {
        Self {
            resolver: ConnectionResolver::new(Arc::clone(&store)),
            store,
            connector,
        }
    }

    /// Dispatches every record of `notification` concurrently.
    ///
    /// Every record runs to completion; the first failing record (in record
    /// order) then fails the whole notification.
    pub async fn dispatch(
        &self,
        notification: &StorageNotification,
        streams: &StreamConfigs,
    ) -> BridgeResult<Vec<Outcome>> {
        let results = join_all(
            notification
                .records
                .iter()
                .map(|record| self.dispatch_record(record, streams)),
        )
        .await
        .into_iter()
        .collect::<BridgeResult<Vec<_>>>()?;
        Ok(results.into_iter().flatten().collect())
    }

    pub async fn dispatch_record(
        &self,
        record: &NotificationRecord,
        streams: &StreamConfigs,
    ) -> BridgeResult<Vec<Outcome>> {
        let bucket = record.bucket();
        let key = record.key();
        let object_path = format!("{bucket}/{key}");

        let object = self
            .store
            .get_object(bucket, &key)
            .await
            .map_err(|e| e.with_context(&object_path))?;

        if object.is_delivered() {
            debug!("{object_path} already delivered, skipping");
            return Ok(vec![Outcome::AlreadyDelivered {
                bucket: bucket.to_string(),
                key,
            }]);
        }

        let matches = matching_streams(streams, &object_path);
        let outcomes = if matches.is_empty() {
            warn!("no configured SFTP destination for {object_path}");
            vec![Outcome::NoDestination {
                bucket: bucket.to_string(),
                key: key.clone(),
            }]
        } else {
            // Sibling writes finish and close their sessions even when one fails.
            join_all(matches.into_iter().map(|(name, stream)| {
                self.push_to_stream(name, stream, &object.body, &object_path)
            }))
            .await
            .into_iter()
            .collect::<BridgeResult<Vec<_>>>()?
        };

        self.mark_delivered(bucket, &key, object.metadata).await?;
        Ok(outcomes)
    }

    /// Sets the delivered flag, keeping every other metadata entry.
    pub async fn mark_delivered(
        &self,
        bucket: &str,
        key: &str,
        mut metadata: HashMap<String, String>,
    ) -> BridgeResult<()> {
        metadata.insert(DELIVERED_METADATA_KEY.to_string(), "true".to_string());
        self.store
            .replace_metadata(bucket, key, metadata)
            .await
            .map_err(|e| e.with_context(format!("marking {bucket}/{key} delivered")))
    }

    async fn push_to_stream(
        &self,
        stream_name: &str,
        stream: &StreamConfig,
        body: &[u8],
        object_path: &str,
    ) -> BridgeResult<Outcome> {
        let connection = self
            .resolver
            .resolve(stream)
            .await
            .map_err(|e| e.with_context(format!("[{stream_name}]")))?;
        let remote_path = remote_destination(stream, object_path);

        with_session(self.connector.as_ref(), &connection, |session| async move {
            info!("writing {remote_path}...");
            session.write_file(&remote_path, body).await?;
            info!("...done");
            info!("[{stream_name}]: moved 1 files from S3 to SFTP");
            Ok(Outcome::Pushed {
                stream: stream_name.to_string(),
                remote_path,
            })
        })
        .await
        .map_err(|e| e.with_context(format!("[{stream_name}]")))
    }
}
