use std::future::Future;
use std::sync::Arc;

use bridge_common::kafka_producer::KafkaWriter;
use bridge_common::metrics::setup_metrics_routes;
use bridge_common::MessageWriter;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Config;
use crate::router;

/// Connects to Kafka, then serves the bridge until `shutdown` resolves.
pub async fn serve<F>(config: Config, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let writer = KafkaWriter::new(
        &config.kafka,
        config.kafka_topic.clone(),
        config.close_timeout(),
    )?;

    serve_with_writer(Arc::new(writer), config.export_prometheus, listener, shutdown).await
}

/// Serves the bridge with the given writer. Once the server has drained after
/// `shutdown`, the writer is closed exactly once; a close failure is only logged.
pub async fn serve_with_writer<W, F>(
    writer: Arc<W>,
    export_prometheus: bool,
    listener: TcpListener,
    shutdown: F,
) -> anyhow::Result<()>
where
    W: MessageWriter + Send + Sync + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let app = router::router(writer.clone());
    // Don't install metrics unless asked to, a global recorder does not play well with tests
    let app = if export_prometheus {
        setup_metrics_routes(app)?
    } else {
        app
    };

    info!("listening on {:?}", listener.local_addr()?);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;
    info!("HTTP server stopped, closing broker writer");

    if let Err(err) = writer.close().await {
        error!("failed to close broker writer: {}", err);
    }

    Ok(served?)
}
