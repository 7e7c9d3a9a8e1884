//! SFTP remote endpoint adapter.
//!
//! [`SftpConnector`] opens one SSH connection per session, authenticates with
//! a private key and/or password, optionally pins the server key by SHA-256
//! fingerprint, and serves file operations over the `sftp` subsystem.

pub mod auth;
pub mod connector;
pub mod error;
pub mod paths;
pub mod session;

pub use connector::{SftpConnector, SftpSettings};
pub use session::SftpRemoteSession;
