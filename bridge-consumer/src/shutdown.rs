use std::future::Future;

use bridge_common::signals::wait_for_termination;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Spawns the task that turns SIGTERM/SIGINT into a cancelled `token`.
/// It is the only task that cancels the token.
pub fn spawn_shutdown_listener(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(cancel_on(wait_for_termination(), token))
}

/// Cancels `token` once `signal` resolves.
pub async fn cancel_on<F>(signal: F, token: CancellationToken)
where
    F: Future<Output = ()>,
{
    signal.await;
    info!("Shutting down gracefully...");
    token.cancel();
}
