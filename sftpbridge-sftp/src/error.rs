//! SSH and SFTP error mapping.

use russh_sftp::client::error::Error as SftpError;
use russh_sftp::protocol::StatusCode;
use sftpbridge_core::BridgeError;

/// Maps an SFTP client failure on `what` (operation and path).
pub fn map_sftp_error(err: SftpError, what: &str) -> BridgeError {
    match err {
        SftpError::Timeout => BridgeError::Timeout(format!("{what}: sftp request timed out")),
        other => BridgeError::Remote(format!("{what}: {other}")),
    }
}

pub fn map_ssh_error(err: russh::Error, what: &str) -> BridgeError {
    match err {
        russh::Error::ConnectionTimeout | russh::Error::InactivityTimeout => {
            BridgeError::Timeout(format!("{what}: {err}"))
        }
        russh::Error::UnknownKey => {
            BridgeError::Remote(format!("{what}: server host key rejected"))
        }
        other => BridgeError::Remote(format!("{what}: {other}")),
    }
}

pub fn is_missing_path(err: &SftpError) -> bool {
    matches!(err, SftpError::Status(status) if status.status_code == StatusCode::NoSuchFile)
}
