//! Shared types for sync operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Object metadata key carrying the delivered flag.
///
/// Kept as `synched` so objects flagged by earlier deployments stay recognized.
pub const DELIVERED_METADATA_KEY: &str = "synched";

/// Metadata map written with every object pulled from the remote side.
pub fn delivered_metadata() -> HashMap<String, String> {
    HashMap::from([(DELIVERED_METADATA_KEY.to_string(), "true".to_string())])
}

/// One remote directory-listing result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub is_dir: bool,
    /// Last modification time; `None` when the listing carries none.
    pub modified: Option<DateTime<Utc>>,
    pub size: Option<u64>,
    pub permissions: Option<u32>,
}

impl RemoteEntry {
    pub fn file(name: impl Into<String>, modified: Option<DateTime<Utc>>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            modified,
            size: None,
            permissions: None,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
            modified: None,
            size: None,
            permissions: None,
        }
    }
}

/// An object read from the store: payload plus user metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub metadata: HashMap<String, String>,
}

impl StoredObject {
    /// True iff the delivered flag is the literal `true`.
    pub fn is_delivered(&self) -> bool {
        self.metadata
            .get(DELIVERED_METADATA_KEY)
            .is_some_and(|v| v == "true")
    }
}

/// A storage-change notification (`{"Records": [...]}`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageNotification {
    #[serde(rename = "Records")]
    pub records: Vec<NotificationRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub s3: S3Entity,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketRef,
    pub object: ObjectRef,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketRef {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub key: String,
}

impl NotificationRecord {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            s3: S3Entity {
                bucket: BucketRef { name: bucket.into() },
                object: ObjectRef { key: key.into() },
            },
        }
    }

    pub fn bucket(&self) -> &str {
        &self.s3.bucket.name
    }

    /// Object key with the event encoding (`+` for space, percent escapes) undone.
    pub fn key(&self) -> String {
        let raw = self.s3.object.key.replace('+', " ");
        match urlencoding::decode(&raw) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => raw,
        }
    }
}

/// Identity of the current invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationContext {
    pub function_name: String,
    pub region: String,
    pub account_id: String,
}

impl InvocationContext {
    pub fn new(
        function_name: impl Into<String>,
        region: impl Into<String>,
        account_id: impl Into<String>,
    ) -> Self {
        Self {
            function_name: function_name.into(),
            region: region.into(),
            account_id: account_id.into(),
        }
    }

    /// Parses `arn:aws:lambda:<region>:<account>:function:<name>[:<qualifier>]`.
    pub fn from_function_arn(arn: &str) -> Option<Self> {
        let parts: Vec<&str> = arn.split(':').collect();
        match parts.as_slice() {
            ["arn", _, "lambda", region, account, "function", name, ..]
                if !region.is_empty() && !account.is_empty() && !name.is_empty() =>
            {
                Some(Self::new(*name, *region, *account))
            }
            _ => None,
        }
    }
}

/// A message received from the retry queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueMessage {
    pub body: String,
    pub receipt_handle: String,
    /// Approximate number of times the queue has handed this message out.
    pub receive_count: u32,
}

/// Result of one unit of sync work.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// A remote file was written to the store and archived remotely.
    Pulled {
        stream: String,
        remote_path: String,
        bucket: String,
        key: String,
    },
    /// An expired archived file was deleted from the remote side.
    Purged { stream: String, path: String },
    /// A stored object was written to one remote destination.
    Pushed { stream: String, remote_path: String },
    AlreadyDelivered { bucket: String, key: String },
    NoDestination { bucket: String, key: String },
    /// A failed notification was placed on the retry queue.
    Requeued { message_id: Option<String> },
    /// A queued notification was replayed and acknowledged.
    Replayed {
        receipt_handle: String,
        outcomes: Vec<Outcome>,
    },
    /// A queued notification failed again and stays queued.
    ReplayFailed {
        receipt_handle: String,
        error: String,
    },
    /// A queued notification passed the redelivery limit and was left for dead-lettering.
    Exhausted {
        receipt_handle: String,
        receive_count: u32,
    },
}
