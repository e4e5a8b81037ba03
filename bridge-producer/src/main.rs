use envconfig::Envconfig;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use bridge_common::signals::wait_for_termination;
use bridge_producer::config::Config;
use bridge_producer::server::serve;

async fn shutdown() {
    wait_for_termination().await;
    tracing::info!("Shutting down gracefully...");
}

#[tokio::main]
async fn main() {
    let config = Config::init_from_env().expect("Invalid configuration:");

    // stdout with a level configured by the RUST_LOG envvar (default=INFO)
    let log_layer = tracing_subscriber::fmt::layer().with_filter(
        EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .from_env_lossy(),
    );
    tracing_subscriber::registry().with(log_layer).init();

    let listener = tokio::net::TcpListener::bind(config.bind())
        .await
        .expect("could not bind port");

    match serve(config, listener, shutdown()).await {
        Ok(_) => tracing::info!("bridge-producer stopped"),
        Err(e) => {
            tracing::error!("bridge-producer failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
