//! Stream and engine configuration.

use crate::path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Retention applied to archived remote files when a stream sets none.
pub const DEFAULT_RETENTION_DAYS: u32 = 14;

/// Default SSH port.
pub const DEFAULT_SFTP_PORT: u16 = 22;

/// Stream name → stream configuration, in name order.
pub type StreamConfigs = BTreeMap<String, StreamConfig>;

/// One configured pairing of a remote directory with an object-store location.
///
/// Loaded fresh for every invocation and never mutated afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamConfig {
    /// Remote directory; unset or empty means the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sftp_location: Option<String>,

    /// `bucket[/key-prefix]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_retention_days: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sftp_config: Option<SftpConfig>,
}

impl StreamConfig {
    /// Retention in days; zero counts as unset.
    pub fn retention_days(&self) -> u32 {
        self.file_retention_days
            .filter(|days| *days > 0)
            .unwrap_or(DEFAULT_RETENTION_DAYS)
    }

    /// Parsed store location, or `None` when unset or without a bucket segment.
    pub fn store_location(&self) -> Option<StoreLocation> {
        self.s3_location.as_deref().and_then(StoreLocation::parse)
    }

    /// Remote root used when pulling. A location with no segments is `/`.
    pub fn remote_root(&self) -> &str {
        self.sftp_location
            .as_deref()
            .filter(|location| !path::to_segments(location).is_empty())
            .unwrap_or("/")
    }
}

/// Bucket plus optional key prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreLocation {
    pub bucket: String,
    pub prefix: String,
}

impl StoreLocation {
    pub fn parse(location: &str) -> Option<Self> {
        let segments = path::to_segments(location);
        let (bucket, rest) = segments.split_first()?;
        Some(Self {
            bucket: (*bucket).to_string(),
            prefix: rest.join("/"),
        })
    }

    /// `bucket/prefix` in segment form.
    pub fn full_path(&self) -> String {
        path::join([self.bucket.as_str(), self.prefix.as_str()])
    }
}

/// Connection block as it appears in the stream configuration.
///
/// `s3_private_key` is a `bucket/key` pointer to the private key material;
/// it is resolved into [`RemoteConnectionConfig::private_key`] before use.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SftpConfig {
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_private_key: Option<String>,
    /// Pinned server key fingerprint, e.g. `SHA256:...`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_fingerprint: Option<String>,
}

impl fmt::Debug for SftpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SftpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &redacted(&self.password))
            .field("private_key", &redacted(&self.private_key))
            .field("passphrase", &redacted(&self.passphrase))
            .field("s3_private_key", &self.s3_private_key)
            .field("host_fingerprint", &self.host_fingerprint)
            .finish()
    }
}

/// Fully resolved connection parameters handed to a [`crate::ports::RemoteConnector`].
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RemoteConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub private_key: Option<String>,
    pub passphrase: Option<String>,
    pub host_fingerprint: Option<String>,
}

impl From<&SftpConfig> for RemoteConnectionConfig {
    fn from(config: &SftpConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port.unwrap_or(DEFAULT_SFTP_PORT),
            username: config.username.clone(),
            password: config.password.clone(),
            private_key: config.private_key.clone(),
            passphrase: config.passphrase.clone(),
            host_fingerprint: config.host_fingerprint.clone(),
        }
    }
}

impl fmt::Debug for RemoteConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &redacted(&self.password))
            .field("private_key", &redacted(&self.private_key))
            .field("passphrase", &redacted(&self.passphrase))
            .field("host_fingerprint", &self.host_fingerprint)
            .finish()
    }
}

fn redacted(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| "<redacted>")
}

/// Redelivery limits owned by the queue provider, made explicit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedeliveryPolicy {
    /// Receives after which a message is left to the queue's dead-letter redrive.
    pub max_receive_count: Option<u32>,

    /// Visibility timeout requested on receive; `None` keeps the queue default.
    pub visibility_timeout_secs: Option<i32>,
}

impl RedeliveryPolicy {
    /// Returns true when a message received `receive_count` times should not be replayed.
    pub fn is_exhausted(&self, receive_count: u32) -> bool {
        self.max_receive_count.is_some_and(|max| receive_count > max)
    }
}

/// Engine settings shared by every invocation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Reserved directory name marking an archive subtree on the remote side.
    pub archive_dir_name: String,

    /// Stream name in a scheduled trigger that selects the retry drain.
    pub drain_keyword: String,

    /// Receive calls per drain cycle.
    pub drain_max_batches: u32,

    /// Messages requested per receive call.
    pub drain_batch_size: i32,

    pub redelivery: RedeliveryPolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            archive_dir_name: ".done".to_string(),
            drain_keyword: "poll".to_string(),
            drain_max_batches: 10,
            drain_batch_size: 10,
            redelivery: RedeliveryPolicy::default(),
        }
    }
}
