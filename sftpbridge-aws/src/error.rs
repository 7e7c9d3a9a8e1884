//! SDK error mapping.

use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use sftpbridge_core::BridgeError;
use std::error::Error;
use std::fmt::Debug;

/// Maps an SDK failure onto the bridge taxonomy.
///
/// Client-side timeouts (including connect timeouts) become
/// [`BridgeError::Timeout`]; everything else goes through `wrap` with the
/// SDK's full error chain in the message.
pub fn map_sdk_error<E, R>(
    err: SdkError<E, R>,
    wrap: fn(String) -> BridgeError,
    what: &str,
) -> BridgeError
where
    E: Error + 'static,
    R: Debug,
{
    let timed_out = match &err {
        SdkError::TimeoutError(_) => true,
        SdkError::DispatchFailure(failure) => failure.is_timeout(),
        _ => false,
    };
    let message = format!("{what}: {}", DisplayErrorContext(&err));
    if timed_out {
        BridgeError::Timeout(message)
    } else {
        wrap(message)
    }
}
