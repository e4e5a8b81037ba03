use async_trait::async_trait;
use rdkafka::{
    consumer::{Consumer, StreamConsumer},
    error::KafkaError,
    ClientConfig, Message as _,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::{BrokerError, MessageReader};
use crate::config::{ConsumerConfig, KafkaConfig};
use crate::message::Message;

/// `MessageReader` subscribed to a single topic as a member of a consumer group.
/// Partition assignment is left to the group coordinator.
pub struct KafkaReader {
    consumer: StreamConsumer,
    topic: String,
}

impl KafkaReader {
    pub fn new(
        common_config: &KafkaConfig,
        consumer_config: &ConsumerConfig,
    ) -> Result<Self, KafkaError> {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &common_config.kafka_hosts)
            .set("statistics.interval.ms", "10000")
            .set("group.id", &consumer_config.kafka_consumer_group)
            .set(
                "auto.offset.reset",
                consumer_config.kafka_consumer_offset_reset.as_str(),
            )
            .set(
                "enable.auto.commit",
                consumer_config.kafka_consumer_auto_commit.to_string(),
            )
            .set(
                "auto.commit.interval.ms",
                consumer_config
                    .kafka_consumer_auto_commit_interval_ms
                    .to_string(),
            );

        if !common_config.kafka_client_id.is_empty() {
            client_config.set("client.id", &common_config.kafka_client_id);
        }

        if common_config.kafka_tls {
            client_config
                .set("security.protocol", "ssl")
                .set("enable.ssl.certificate.verification", "false");
        };

        debug!("rdkafka configuration: {:?}", client_config);
        let consumer: StreamConsumer = client_config.create()?;
        consumer.subscribe(&[consumer_config.kafka_consumer_topic.as_str()])?;
        info!(
            topic = %consumer_config.kafka_consumer_topic,
            group = %consumer_config.kafka_consumer_group,
            "subscribed to Kafka topic"
        );

        Ok(Self {
            consumer,
            topic: consumer_config.kafka_consumer_topic.clone(),
        })
    }
}

#[async_trait]
impl MessageReader for KafkaReader {
    async fn read(&mut self, cancel: &CancellationToken) -> Result<Message, BrokerError> {
        let received = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BrokerError::Interrupted),
            received = self.consumer.recv() => received?,
        };

        let Some(payload) = received.payload() else {
            return Err(BrokerError::EmptyPayload);
        };
        let message = match received.key() {
            Some(key) => Message::with_key(key.to_vec(), payload.to_vec()),
            None => Message::new(payload.to_vec()),
        };

        Ok(message)
    }

    async fn close(self) -> Result<(), BrokerError> {
        info!(topic = %self.topic, "unsubscribing from Kafka topic");
        self.consumer.unsubscribe();
        Ok(())
    }
}
