//! Bridge error types.

use std::fmt::Display;
use thiserror::Error;

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors that can occur while synchronizing between SFTP and the object store.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("object store operation failed: {0}")]
    Store(String),

    #[error("remote transfer failed: {0}")]
    Remote(String),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("retry queue operation failed: {0}")]
    Queue(String),

    #[error("unrecognized trigger: {0}")]
    InvalidTrigger(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BridgeError {
    /// Returns true for the transient client-timeout class.
    pub fn is_timeout(&self) -> bool {
        matches!(self, BridgeError::Timeout(_))
    }

    pub fn is_config(&self) -> bool {
        matches!(self, BridgeError::Config(_))
    }

    /// Returns true for I/O failures against the store, the remote side or the queue.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            BridgeError::Store(_)
                | BridgeError::Remote(_)
                | BridgeError::Timeout(_)
                | BridgeError::Queue(_)
        )
    }

    /// Prefixes the message with `context` (stream name, path) keeping the variant.
    ///
    /// `Serialization` has no message of its own and is returned unchanged;
    /// callers that parse untrusted payloads attach their context when mapping.
    pub fn with_context(self, context: impl Display) -> Self {
        match self {
            BridgeError::Config(m) => BridgeError::Config(format!("{context}: {m}")),
            BridgeError::Store(m) => BridgeError::Store(format!("{context}: {m}")),
            BridgeError::Remote(m) => BridgeError::Remote(format!("{context}: {m}")),
            BridgeError::Timeout(m) => BridgeError::Timeout(format!("{context}: {m}")),
            BridgeError::Queue(m) => BridgeError::Queue(format!("{context}: {m}")),
            BridgeError::InvalidTrigger(m) => {
                BridgeError::InvalidTrigger(format!("{context}: {m}"))
            }
            other @ BridgeError::Serialization(_) => other,
        }
    }
}
