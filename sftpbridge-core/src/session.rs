//! Scoped remote sessions.

use crate::config::RemoteConnectionConfig;
use crate::error::BridgeResult;
use crate::ports::{RemoteConnector, RemoteSession};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Opens a session, runs `f` against it and closes it on every exit path.
///
/// A close failure is logged and never replaces the result of `f`.
pub async fn with_session<T, F, Fut>(
    connector: &dyn RemoteConnector,
    config: &RemoteConnectionConfig,
    f: F,
) -> BridgeResult<T>
where
    F: FnOnce(Arc<dyn RemoteSession>) -> Fut,
    Fut: Future<Output = BridgeResult<T>>,
{
    let session = connector.connect(config).await?;
    debug!("opened remote session to {}@{}", config.username, config.host);

    let result = f(Arc::clone(&session)).await;

    if let Err(e) = session.close().await {
        warn!("failed to close remote session to {}: {e}", config.host);
    }
    result
}
