use bridge_common::config::{ConsumerConfig, KafkaConfig};
use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    #[envconfig(from = "METRICS_BIND_HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "METRICS_BIND_PORT", default = "3302")]
    pub port: u16,

    #[envconfig(default = "true")]
    pub export_prometheus: bool,

    #[envconfig(nested = true)]
    pub kafka: KafkaConfig,

    #[envconfig(nested = true)]
    pub consumer: ConsumerConfig,
}

impl Config {
    /// Produce a host:port address for the metrics listener.
    pub fn bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
