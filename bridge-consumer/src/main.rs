//! Consume messages from a Kafka topic and log them until SIGTERM/SIGINT.
use axum::{routing::get, Router};
use envconfig::Envconfig;
use eyre::{Result, WrapErr};
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use bridge_common::kafka_consumer::KafkaReader;
use bridge_common::metrics::{serve, setup_metrics_routes};
use bridge_consumer::config::Config;
use bridge_consumer::consumer::ConsumerLoop;
use bridge_consumer::processor::LogProcessor;
use bridge_consumer::shutdown::spawn_shutdown_listener;

async fn index() -> &'static str {
    "bridge-consumer"
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::init_from_env().expect("Invalid configuration:");

    let log_layer = tracing_subscriber::fmt::layer().with_filter(
        EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .from_env_lossy(),
    );
    tracing_subscriber::registry().with(log_layer).init();

    if config.export_prometheus {
        let router = setup_metrics_routes(Router::new().route("/", get(index)))
            .wrap_err("failed to install metrics recorder")?;
        let bind = config.bind();
        tokio::spawn(async move {
            if let Err(e) = serve(router, &bind).await {
                tracing::error!("failed to serve metrics on {}: {}", bind, e);
            }
        });
    }

    let reader = KafkaReader::new(&config.kafka, &config.consumer)
        .wrap_err("failed to create Kafka consumer")?;

    let shutdown = CancellationToken::new();
    spawn_shutdown_listener(shutdown.clone());

    let report = ConsumerLoop::new(reader, LogProcessor).run(shutdown).await;
    tracing::info!(
        processed = report.processed,
        read_errors = report.read_errors,
        "bridge-consumer stopped"
    );

    Ok(())
}
