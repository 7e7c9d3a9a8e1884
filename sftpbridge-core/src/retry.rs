//! Retry queue coordination for failed push dispatches.
//!
//! Producer side: a notification whose dispatch failed is serialized as-is
//! onto the durable queue. Consumer side: a drain cycle receives batches and
//! replays each message through the push engine strictly one after another,
//! deleting a message only once its replay succeeded. A failed replay is left
//! on the queue; redelivery timing and dead-lettering belong to the queue.

use crate::config::{BridgeConfig, RedeliveryPolicy, StreamConfigs};
use crate::error::{BridgeError, BridgeResult};
use crate::ports::RetryQueue;
use crate::push::PushDispatchEngine;
use crate::types::{Outcome, QueueMessage, StorageNotification};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct RetryCoordinator {
    queue: Arc<dyn RetryQueue>,
    push: Arc<PushDispatchEngine>,
    policy: RedeliveryPolicy,
    max_batches: u32,
    batch_size: i32,
}

impl RetryCoordinator {
    pub fn new(
        queue: Arc<dyn RetryQueue>,
        push: Arc<PushDispatchEngine>,
        config: &BridgeConfig,
    ) -> Self {
        Self {
            queue,
            push,
            policy: config.redelivery.clone(),
            max_batches: config.drain_max_batches,
            batch_size: config.drain_batch_size,
        }
    }

    /// Places the original notification payload on the retry queue.
    ///
    /// There is no fallback behind the queue: a failure here is returned as-is.
    pub async fn enqueue_for_retry(
        &self,
        notification: &serde_json::Value,
    ) -> BridgeResult<Outcome> {
        info!("writing failed message to queue for later processing");
        let body = serde_json::to_string(notification)?;
        let message_id = self.queue.send(body).await?;
        debug!("queued retry message {message_id:?}");
        Ok(Outcome::Requeued { message_id })
    }

    /// Runs up to `max_batches` receive-and-replay rounds.
    ///
    /// Receive failures propagate. Replay failures are reported per message
    /// and never fail the drain.
    pub async fn drain(&self, streams: &StreamConfigs) -> BridgeResult<Vec<Outcome>> {
        let mut outcomes = Vec::new();
        for batch in 0..self.max_batches {
            let messages = self.queue.receive(self.batch_size, &self.policy).await?;
            if messages.is_empty() {
                debug!("retry queue empty after {batch} batches");
                break;
            }
            for message in messages {
                outcomes.push(self.replay(message, streams).await);
            }
        }

        let replayed = outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::Replayed { .. }))
            .count();
        info!("replayed {replayed} of {} queued messages", outcomes.len());
        Ok(outcomes)
    }

    async fn replay(&self, message: QueueMessage, streams: &StreamConfigs) -> Outcome {
        if self.policy.is_exhausted(message.receive_count) {
            warn!(
                "retry message {} received {} times, leaving it for dead-lettering",
                message.receipt_handle, message.receive_count
            );
            return Outcome::Exhausted {
                receipt_handle: message.receipt_handle,
                receive_count: message.receive_count,
            };
        }

        match self.try_replay(&message, streams).await {
            Ok(outcomes) => Outcome::Replayed {
                receipt_handle: message.receipt_handle,
                outcomes,
            },
            Err(e) => {
                warn!("replay failed, message stays queued: {e}");
                Outcome::ReplayFailed {
                    receipt_handle: message.receipt_handle,
                    error: e.to_string(),
                }
            }
        }
    }

    async fn try_replay(
        &self,
        message: &QueueMessage,
        streams: &StreamConfigs,
    ) -> BridgeResult<Vec<Outcome>> {
        let notification: StorageNotification =
            serde_json::from_str(&message.body).map_err(|e| {
                BridgeError::Queue(format!(
                    "malformed retry message {}: {e}",
                    message.receipt_handle
                ))
            })?;
        let outcomes = self.push.dispatch(&notification, streams).await?;
        self.queue.delete(&message.receipt_handle).await?;
        Ok(outcomes)
    }
}
