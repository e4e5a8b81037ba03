use tokio::signal;
use tracing::info;

/// Resolves once the process receives SIGTERM or SIGINT.
#[cfg(unix)]
pub async fn wait_for_termination() {
    let mut term = signal::unix::signal(signal::unix::SignalKind::terminate())
        .expect("failed to register SIGTERM handler");

    let mut interrupt = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .expect("failed to register SIGINT handler");

    tokio::select! {
        _ = term.recv() => info!("received SIGTERM"),
        _ = interrupt.recv() => info!("received SIGINT"),
    };
}

/// Resolves once the process receives Ctrl-C.
#[cfg(not(unix))]
pub async fn wait_for_termination() {
    signal::ctrl_c()
        .await
        .expect("failed to register Ctrl-C handler");
    info!("received Ctrl-C");
}
