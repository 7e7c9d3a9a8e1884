//! Bidirectional SFTP ↔ object store synchronization engine.
//!
//! Provides:
//! - Pull sync: recursive remote tree walk into the store, with archive purge
//! - Push dispatch: storage-change notifications fanned out to matching remote streams
//! - At-least-once delivery through a durable retry queue
//! - Invocation routing for scheduled and storage-change triggers
//!
//! The object store, remote endpoint, queue and configuration service are
//! reached through the traits in [`ports`].

pub mod config;
pub mod config_source;
pub mod error;
pub mod path;
pub mod ports;
pub mod pull;
pub mod push;
pub mod resolver;
pub mod retry;
pub mod router;
pub mod session;
pub mod types;
pub mod walker;

pub use config::{BridgeConfig, StreamConfig, StreamConfigs};
pub use error::{BridgeError, BridgeResult};
pub use router::InvocationRouter;
pub use types::*;
