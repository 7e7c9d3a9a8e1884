//! Remote → store synchronization.
//!
//! For each active file found by the walker: read it, write it to the store
//! with the delivered flag already set, then move it into the archive
//! directory beside it. Archived files older than the stream's retention are
//! deleted. Failures propagate; the next scheduled run retries.

use crate::config::{BridgeConfig, StoreLocation, StreamConfig};
use crate::error::{BridgeError, BridgeResult};
use crate::path;
use crate::ports::{ObjectStore, RemoteConnector, RemoteSession};
use crate::resolver::ConnectionResolver;
use crate::session::with_session;
use crate::types::{Outcome, delivered_metadata};
use crate::walker::{EntryKind, RemoteWalker, WalkContext, WalkEntry};
use chrono::{DateTime, Days, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// Earliest modification time an archived file may have and still be kept.
pub fn retention_cutoff(now: DateTime<Utc>, retention_days: u32) -> DateTime<Utc> {
    now.checked_sub_days(Days::new(u64::from(retention_days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Returns true if an archived file modified at `modified` is past retention.
///
/// A file exactly `retention_days` old is kept; files without a known
/// modification time are never purged.
pub fn is_purge_eligible(
    modified: Option<DateTime<Utc>>,
    retention_days: u32,
    now: DateTime<Utc>,
) -> bool {
    modified.is_some_and(|m| m < retention_cutoff(now, retention_days))
}

/// Store key for a remote file at `dir/name` pulled from `remote_root`.
pub fn destination_key(
    remote_root: &str,
    dir: &str,
    name: &str,
    location: &StoreLocation,
) -> String {
    let dest_dir = path::map_destination(remote_root, dir, &location.prefix);
    path::join([dest_dir.as_str(), name])
}

pub struct PullSyncEngine {
    store: Arc<dyn ObjectStore>,
    connector: Arc<dyn RemoteConnector>,
    resolver: ConnectionResolver,
    archive_dir_name: String,
}

impl PullSyncEngine {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        connector: Arc<dyn RemoteConnector>,
        config: &BridgeConfig,
    ) -> Self {
        Self {
            resolver: ConnectionResolver::new(Arc::clone(&store)),
            store,
            connector,
            archive_dir_name: config.archive_dir_name.clone(),
        }
    }

    /// Pulls one stream: resolve, connect, sync its remote root, disconnect.
    pub async fn sync_stream(
        &self,
        stream_name: &str,
        stream: &StreamConfig,
        now: DateTime<Utc>,
    ) -> BridgeResult<Vec<Outcome>> {
        let location = stream.store_location().ok_or_else(|| {
            BridgeError::Config(format!("streamName [{stream_name}] has no s3Location"))
        })?;
        let connection = self
            .resolver
            .resolve(stream)
            .await
            .map_err(|e| e.with_context(format!("[{stream_name}]")))?;

        info!(
            "attempting connection for [{stream_name}]: host[{}], username[{}]",
            connection.host, connection.username
        );

        let outcomes = with_session(self.connector.as_ref(), &connection, |session| async move {
            self.sync_directory(
                session.as_ref(),
                stream_name,
                stream.remote_root(),
                &location,
                stream.retention_days(),
                now,
            )
            .await
        })
        .await
        .map_err(|e| e.with_context(format!("[{stream_name}]")))?;

        let moved = outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::Pulled { .. }))
            .count();
        info!("[{stream_name}]: moved {moved} files from SFTP to S3");
        Ok(outcomes)
    }

    /// Syncs the tree under `remote_root` into `location` through an open session.
    pub async fn sync_directory(
        &self,
        session: &dyn RemoteSession,
        stream_name: &str,
        remote_root: &str,
        location: &StoreLocation,
        retention_days: u32,
        now: DateTime<Utc>,
    ) -> BridgeResult<Vec<Outcome>> {
        let walker = RemoteWalker::new(session, &self.archive_dir_name);
        let entries = walker.walk(WalkContext::new(remote_root)).await?;

        let mut outcomes = Vec::new();
        for item in entries {
            match item.kind {
                EntryKind::Directory => {}
                EntryKind::Archived => {
                    if is_purge_eligible(item.entry.modified, retention_days, now) {
                        session
                            .remove_file(&item.path)
                            .await
                            .map_err(|e| e.with_context(format!("purging {}", item.path)))?;
                        debug!("purged {} (retention {retention_days} days)", item.path);
                        outcomes.push(Outcome::Purged {
                            stream: stream_name.to_string(),
                            path: item.path,
                        });
                    }
                }
                EntryKind::Active => {
                    let outcome = self
                        .pull_file(session, stream_name, remote_root, location, &item)
                        .await
                        .map_err(|e| e.with_context(&item.path))?;
                    outcomes.push(outcome);
                }
            }
        }
        Ok(outcomes)
    }

    async fn pull_file(
        &self,
        session: &dyn RemoteSession,
        stream_name: &str,
        remote_root: &str,
        location: &StoreLocation,
        item: &WalkEntry,
    ) -> BridgeResult<Outcome> {
        let body = session.read_file(&item.path).await?;
        let key = destination_key(remote_root, &item.dir, &item.entry.name, location);

        info!("writing {}/{key}...", location.bucket);
        self.store
            .put_object(&location.bucket, &key, body, delivered_metadata())
            .await?;
        info!("...done");

        let archived = path::child(
            &path::child(&item.dir, &self.archive_dir_name),
            &item.entry.name,
        );
        session.rename(&item.path, &archived).await?;
        debug!("archived {} to {archived}", item.path);

        Ok(Outcome::Pulled {
            stream: stream_name.to_string(),
            remote_path: item.path.clone(),
            bucket: location.bucket.clone(),
            key,
        })
    }
}
