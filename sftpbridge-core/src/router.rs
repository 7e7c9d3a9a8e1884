//! Invocation routing.
//!
//! A storage-change notification goes to push dispatch, falling back to the
//! retry queue on failure. A scheduled trigger names streams to pull; the
//! drain keyword among them selects a retry-queue drain instead.

use crate::config::{BridgeConfig, StreamConfigs};
use crate::error::{BridgeError, BridgeResult};
use crate::ports::{ConfigSource, ObjectStore, RemoteConnector, RetryQueue};
use crate::pull::PullSyncEngine;
use crate::push::PushDispatchEngine;
use crate::retry::RetryCoordinator;
use crate::types::{InvocationContext, Outcome, StorageNotification};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Marker after which a scheduled rule identifier carries stream names.
const RULE_MARKER: &str = "rule/";

/// The shape of an incoming invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum Trigger {
    Storage {
        notification: StorageNotification,
        /// The payload as received, re-queued verbatim on failure.
        raw: Value,
    },
    Scheduled { stream_names: Vec<String> },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Resources {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
struct ScheduledEvent {
    #[serde(default)]
    resources: Option<Resources>,
}

impl Trigger {
    pub fn classify(event: Value) -> BridgeResult<Self> {
        if event.get("Records").is_some() {
            let notification = serde_json::from_value(event.clone())?;
            return Ok(Trigger::Storage {
                notification,
                raw: event,
            });
        }

        let scheduled: ScheduledEvent = serde_json::from_value(event)
            .map_err(|e| BridgeError::InvalidTrigger(e.to_string()))?;
        let stream_names: Vec<String> = match scheduled.resources {
            Some(Resources::One(resource)) => stream_names_from_rule(&resource),
            Some(Resources::Many(resources)) => resources
                .iter()
                .flat_map(|r| stream_names_from_rule(r))
                .collect(),
            None => Vec::new(),
        };
        if stream_names.is_empty() {
            return Err(BridgeError::InvalidTrigger(
                "streamNames required for config discovery".to_string(),
            ));
        }
        Ok(Trigger::Scheduled { stream_names })
    }
}

/// Stream names encoded in a scheduled rule identifier.
///
/// Takes everything after the first case-insensitive `rule/` and splits it on `.`.
pub fn stream_names_from_rule(resource: &str) -> Vec<String> {
    let names = match resource.to_ascii_lowercase().find(RULE_MARKER) {
        Some(idx) => &resource[idx + RULE_MARKER.len()..],
        None => resource,
    };
    names
        .split('.')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect()
}

/// Entry point for one invocation.
pub struct InvocationRouter {
    config: BridgeConfig,
    config_source: Arc<dyn ConfigSource>,
    pull: PullSyncEngine,
    push: Arc<PushDispatchEngine>,
    retry: RetryCoordinator,
}

impl InvocationRouter {
    pub fn new(
        config: BridgeConfig,
        config_source: Arc<dyn ConfigSource>,
        store: Arc<dyn ObjectStore>,
        connector: Arc<dyn RemoteConnector>,
        queue: Arc<dyn RetryQueue>,
    ) -> Self {
        let pull = PullSyncEngine::new(Arc::clone(&store), Arc::clone(&connector), &config);
        let push = Arc::new(PushDispatchEngine::new(store, connector));
        let retry = RetryCoordinator::new(queue, Arc::clone(&push), &config);
        Self {
            config,
            config_source,
            pull,
            push,
            retry,
        }
    }

    pub async fn handle(
        &self,
        context: &InvocationContext,
        event: Value,
    ) -> BridgeResult<Vec<Outcome>> {
        self.handle_at(context, event, Utc::now()).await
    }

    /// Handles `event` with `now` as the retention reference time.
    pub async fn handle_at(
        &self,
        context: &InvocationContext,
        event: Value,
        now: DateTime<Utc>,
    ) -> BridgeResult<Vec<Outcome>> {
        match Trigger::classify(event)? {
            Trigger::Storage { notification, raw } => {
                self.handle_notification(context, &notification, &raw).await
            }
            Trigger::Scheduled { stream_names } => {
                self.handle_scheduled(context, &stream_names, now).await
            }
        }
    }

    /// Push path: any dispatch failure re-queues the original payload and the
    /// invocation still succeeds; only a failure to enqueue is fatal.
    async fn handle_notification(
        &self,
        context: &InvocationContext,
        notification: &StorageNotification,
        raw: &Value,
    ) -> BridgeResult<Vec<Outcome>> {
        let dispatched = match self.config_source.load(context).await {
            Ok(streams) => self.push.dispatch(notification, &streams).await,
            Err(e) => Err(e),
        };

        match dispatched {
            Ok(outcomes) => Ok(outcomes),
            Err(e) => {
                if e.is_config() {
                    warn!("dispatch rejected by stream configuration: {e}");
                } else if e.is_transport() {
                    warn!("dispatch transfer failed: {e}");
                } else {
                    warn!("dispatch failed: {e}");
                }
                let requeued = self.retry.enqueue_for_retry(raw).await.inspect_err(|qe| {
                    error!("failed to queue notification for retry: {qe}");
                })?;
                Ok(vec![requeued])
            }
        }
    }

    /// Pull path: streams run concurrently; a client timeout yields an empty
    /// success since the next scheduled run retries.
    async fn handle_scheduled(
        &self,
        context: &InvocationContext,
        stream_names: &[String],
        now: DateTime<Utc>,
    ) -> BridgeResult<Vec<Outcome>> {
        let result = match self.config_source.load(context).await {
            Ok(streams) => self.run_streams(&streams, stream_names, now).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(outcomes) => Ok(outcomes),
            Err(e) if e.is_timeout() => {
                warn!("client timeout: {e}");
                Ok(Vec::new())
            }
            Err(e) if e.is_config() => {
                error!("scheduled sync misconfigured: {e}");
                Err(e)
            }
            Err(e) => {
                error!("scheduled sync failed: {e}");
                Err(e)
            }
        }
    }

    async fn run_streams(
        &self,
        streams: &StreamConfigs,
        stream_names: &[String],
        now: DateTime<Utc>,
    ) -> BridgeResult<Vec<Outcome>> {
        let results = join_all(stream_names.iter().map(|name| async move {
            if *name == self.config.drain_keyword {
                info!("draining retry queue");
                return self.retry.drain(streams).await;
            }
            let stream = streams.get(name).ok_or_else(|| {
                BridgeError::Config(format!("streamName [{name}] not found in config"))
            })?;
            self.pull.sync_stream(name, stream, now).await
        }))
        .await
        .into_iter()
        .collect::<BridgeResult<Vec<_>>>()?;
        Ok(results.into_iter().flatten().collect())
    }
}
