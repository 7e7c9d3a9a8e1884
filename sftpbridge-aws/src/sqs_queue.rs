//! SQS retry queue.
//!
//! The queue shares the invoked function's name. Its URL is looked up on
//! first use and reused for the rest of the invocation.

use crate::config::AwsConfig;
use crate::error::map_sdk_error;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sqs::Client;
use aws_sdk_sqs::types::{Message, MessageSystemAttributeName};
use sftpbridge_core::config::RedeliveryPolicy;
use sftpbridge_core::ports::RetryQueue;
use sftpbridge_core::{BridgeError, BridgeResult, QueueMessage};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct SqsRetryQueue {
    client: Client,
    queue_name: String,
    queue_url: OnceCell<String>,
}

impl SqsRetryQueue {
    pub fn new(sdk_config: &SdkConfig, config: &AwsConfig, queue_name: impl Into<String>) -> Self {
        let mut builder = aws_sdk_sqs::config::Builder::from(sdk_config);
        if let Some(endpoint) = &config.sqs_endpoint_override {
            builder = builder.endpoint_url(endpoint);
        }
        Self::from_client(Client::from_conf(builder.build()), queue_name)
    }

    pub fn from_client(client: Client, queue_name: impl Into<String>) -> Self {
        Self {
            client,
            queue_name: queue_name.into(),
            queue_url: OnceCell::new(),
        }
    }

    async fn queue_url(&self) -> BridgeResult<&str> {
        let url = self
            .queue_url
            .get_or_try_init(|| async {
                let resp = self
                    .client
                    .get_queue_url()
                    .queue_name(&self.queue_name)
                    .send()
                    .await
                    .map_err(|e| {
                        map_sdk_error(
                            e,
                            BridgeError::Queue,
                            &format!("resolving queue {}", self.queue_name),
                        )
                    })?;
                let url = resp.queue_url().ok_or_else(|| {
                    BridgeError::Queue(format!("no URL returned for queue {}", self.queue_name))
                })?;
                debug!("resolved retry queue {} to {url}", self.queue_name);
                Ok::<_, BridgeError>(url.to_string())
            })
            .await?;
        Ok(url.as_str())
    }
}

/// Converts a received message, dropping it if it cannot be acknowledged.
fn to_queue_message(message: &Message) -> Option<QueueMessage> {
    let Some(receipt_handle) = message.receipt_handle() else {
        warn!("received message {:?} without receipt handle", message.message_id());
        return None;
    };
    let receive_count = message
        .attributes()
        .and_then(|attrs| attrs.get(&MessageSystemAttributeName::ApproximateReceiveCount))
        .and_then(|count| count.parse().ok())
        .unwrap_or(1);
    Some(QueueMessage {
        body: message.body().unwrap_or_default().to_string(),
        receipt_handle: receipt_handle.to_string(),
        receive_count,
    })
}

#[async_trait]
impl RetryQueue for SqsRetryQueue {
    async fn send(&self, body: String) -> BridgeResult<Option<String>> {
        let url = self.queue_url().await?;
        let resp = self
            .client
            .send_message()
            .queue_url(url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, BridgeError::Queue, "send message"))?;
        Ok(resp.message_id().map(str::to_string))
    }

    async fn receive(
        &self,
        max_messages: i32,
        policy: &RedeliveryPolicy,
    ) -> BridgeResult<Vec<QueueMessage>> {
        let url = self.queue_url().await?;
        let resp = self
            .client
            .receive_message()
            .queue_url(url)
            .max_number_of_messages(max_messages)
            .set_visibility_timeout(policy.visibility_timeout_secs)
            .message_system_attribute_names(MessageSystemAttributeName::ApproximateReceiveCount)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, BridgeError::Queue, "receive messages"))?;

        let messages: Vec<QueueMessage> =
            resp.messages().iter().filter_map(to_queue_message).collect();
        debug!("received {} retry messages", messages.len());
        Ok(messages)
    }

    async fn delete(&self, receipt_handle: &str) -> BridgeResult<()> {
        let url = self.queue_url().await?;
        self.client
            .delete_message()
            .queue_url(url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, BridgeError::Queue, "delete message"))?;
        Ok(())
    }
}
