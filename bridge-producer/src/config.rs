use std::time::Duration;

use bridge_common::config::KafkaConfig;
use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "BIND_PORT", default = "3000")]
    pub port: u16,

    #[envconfig(default = "test-topic")]
    pub kafka_topic: String,

    #[envconfig(default = "true")]
    pub export_prometheus: bool,

    // How long to wait for in-flight deliveries when shutting down
    #[envconfig(default = "30000")]
    pub close_timeout_ms: u64,

    #[envconfig(nested = true)]
    pub kafka: KafkaConfig,
}

impl Config {
    /// Produce a host:port address for binding a TcpListener.
    pub fn bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }
}
