use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::{counter, gauge};
use rdkafka::error::KafkaError;
use rdkafka::producer::{DeliveryFuture, FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use rdkafka::ClientConfig;
use tracing::{debug, error, info, instrument};

use crate::client::{BrokerError, MessageWriter};
use crate::config::KafkaConfig;
use crate::message::Message;

pub struct KafkaContext;

impl rdkafka::ClientContext for KafkaContext {
    fn stats(&self, stats: rdkafka::Statistics) {
        gauge!("bridge_kafka_callback_queue_depth").set(stats.replyq as f64);
        gauge!("bridge_kafka_producer_queue_depth").set(stats.msg_cnt as f64);
        gauge!("bridge_kafka_producer_queue_depth_limit").set(stats.msg_max as f64);
        gauge!("bridge_kafka_producer_queue_bytes").set(stats.msg_size as f64);
        gauge!("bridge_kafka_producer_queue_bytes_limit").set(stats.msg_size_max as f64);

        for (_, stats) in stats.brokers {
            let id_string = format!("{}", stats.nodeid);
            if let Some(rtt) = stats.rtt {
                gauge!(
                    "bridge_kafka_produce_rtt_latency_us",
                    "quantile" => "p50",
                    "broker" => id_string.clone()
                )
                .set(rtt.p50 as f64);
                gauge!(
                    "bridge_kafka_produce_rtt_latency_us",
                    "quantile" => "p99",
                    "broker" => id_string.clone()
                )
                .set(rtt.p99 as f64);
            }
            counter!(
                "bridge_kafka_broker_tx_errors_total",
                "broker" => id_string.clone()
            )
            .absolute(stats.txerrs);
            counter!(
                "bridge_kafka_broker_request_timeouts",
                "broker" => id_string
            )
            .absolute(stats.req_timeouts);
        }
    }
}

/// `MessageWriter` backed by a librdkafka producer, writing to a single topic.
#[derive(Clone)]
pub struct KafkaWriter {
    producer: FutureProducer<KafkaContext>,
    topic: String,
    flush_timeout: Duration,
    closed: Arc<AtomicBool>,
}

impl KafkaWriter {
    pub fn new(
        config: &KafkaConfig,
        topic: String,
        flush_timeout: Duration,
    ) -> Result<KafkaWriter, KafkaError> {
        info!("connecting to Kafka brokers at {}...", config.kafka_hosts);

        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &config.kafka_hosts)
            .set("statistics.interval.ms", "10000")
            .set("linger.ms", config.kafka_producer_linger_ms.to_string())
            .set(
                "message.timeout.ms",
                config.kafka_message_timeout_ms.to_string(),
            )
            .set(
                "compression.codec",
                config.kafka_compression_codec.to_owned(),
            )
            .set(
                "queue.buffering.max.kbytes",
                (config.kafka_producer_queue_mib * 1024).to_string(),
            );

        if !config.kafka_client_id.is_empty() {
            client_config.set("client.id", &config.kafka_client_id);
        }

        if config.kafka_tls {
            client_config
                .set("security.protocol", "ssl")
                .set("enable.ssl.certificate.verification", "false");
        };

        debug!("rdkafka configuration: {:?}", client_config);
        let producer: FutureProducer<KafkaContext> =
            client_config.create_with_context(KafkaContext)?;

        // Ping the cluster to make sure we can reach brokers, fail after 10 seconds
        drop(
            producer
                .client()
                .fetch_metadata(None, Timeout::After(Duration::new(10, 0)))?,
        );
        info!("connected to Kafka brokers");

        Ok(KafkaWriter {
            producer,
            topic,
            flush_timeout,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    fn enqueue(&self, message: &Message) -> Result<DeliveryFuture, BrokerError> {
        let record = FutureRecord {
            topic: self.topic.as_str(),
            payload: Some(message.value()),
            partition: None,
            key: message.key(),
            timestamp: None,
            headers: None,
        };

        match self.producer.send_result(record) {
            Ok(ack) => Ok(ack),
            Err((e, _)) => {
                error!("failed to produce message: {}", e);
                Err(BrokerError::Kafka(e))
            }
        }
    }

    async fn process_ack(delivery: DeliveryFuture) -> Result<(), BrokerError> {
        match delivery.await {
            Err(_) => {
                // Cancelled due to timeout while retrying
                counter!("bridge_kafka_produce_errors_total").increment(1);
                error!("failed to produce to Kafka before write timeout");
                Err(BrokerError::DeliveryCanceled)
            }
            Ok(Err((err, _))) => {
                counter!("bridge_kafka_produce_errors_total").increment(1);
                error!("failed to produce to Kafka: {}", err);
                Err(BrokerError::Kafka(err))
            }
            Ok(Ok(_)) => {
                counter!("bridge_kafka_messages_produced_total").increment(1);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl MessageWriter for KafkaWriter {
    #[instrument(skip_all, fields(topic = %self.topic, batch_size = messages.len()))]
    async fn write(&self, messages: Vec<Message>) -> Result<(), BrokerError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BrokerError::Closed);
        }

        // Get every message in the producer queue first, then wait for all the ACKs
        let mut acks = Vec::with_capacity(messages.len());
        for message in &messages {
            acks.push(self.enqueue(message)?);
        }

        let mut first_error = None;
        for ack in acks {
            match Self::process_ack(ack).await {
                Err(err) if first_error.is_none() => first_error = Some(err),
                _ => {}
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn close(&self) -> Result<(), BrokerError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(BrokerError::Closed);
        }

        info!("flushing Kafka producer for topic {}", self.topic);
        let producer = self.producer.clone();
        let timeout = self.flush_timeout;
        tokio::task::spawn_blocking(move || producer.flush(Timeout::After(timeout)))
            .await
            .map_err(|err| {
                error!("join error while flushing Kafka producer: {:?}", err);
                BrokerError::DeliveryCanceled
            })??;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rdkafka::mocking::MockCluster;
    use rdkafka::producer::DefaultProducerContext;
    use rdkafka::types::{RDKafkaApiKey, RDKafkaRespErr};

    use super::*;

    fn start_on_mocked_writer() -> (MockCluster<'static, DefaultProducerContext>, KafkaWriter) {
        let cluster = MockCluster::new(1).expect("failed to create mock brokers");
        let config = KafkaConfig {
            kafka_producer_linger_ms: 0,
            kafka_producer_queue_mib: 50,
            kafka_message_timeout_ms: 500,
            kafka_compression_codec: "none".to_string(),
            kafka_client_id: "".to_string(),
            kafka_hosts: cluster.bootstrap_servers(),
            kafka_tls: false,
        };
        let writer = KafkaWriter::new(&config, "test-topic".to_string(), Duration::from_secs(5))
            .expect("failed to create writer");
        (cluster, writer)
    }

    #[tokio::test]
    async fn kafka_writer_error_handling() {
        // A mocked broker lets us inject produce errors. Cases are grouped in a single
        // test to amortize the startup cost of the producer.
        let (cluster, writer) = start_on_mocked_writer();
        let message = Message::new("Hello Kafka");

        // Wait for the producer to be healthy, to keep kafka_message_timeout_ms short
        for _ in 0..20 {
            if writer.write(vec![message.clone()]).await.is_ok() {
                break;
            }
        }

        writer
            .write(vec![message.clone()])
            .await
            .expect("failed to write one message");
        writer
            .write(vec![message.clone(), Message::with_key("k", "second")])
            .await
            .expect("failed to write two messages");

        // Retriable errors are retried by librdkafka until the message timeout
        let err = [RDKafkaRespErr::RD_KAFKA_RESP_ERR_BROKER_NOT_AVAILABLE; 1];
        cluster.request_errors(RDKafkaApiKey::Produce, &err);
        writer
            .write(vec![message.clone()])
            .await
            .expect("failed to write after one retriable error");

        // Unretriable errors are reported to the caller
        cluster.clear_request_errors(RDKafkaApiKey::Produce);
        let err = [RDKafkaRespErr::RD_KAFKA_RESP_ERR_INVALID_PARTITIONS; 1];
        cluster.request_errors(RDKafkaApiKey::Produce, &err);
        assert!(matches!(
            writer.write(vec![message.clone()]).await,
            Err(BrokerError::Kafka(_))
        ));

        // A sustained transient error ends in a delivery timeout, which fails the whole write
        cluster.clear_request_errors(RDKafkaApiKey::Produce);
        let err = [RDKafkaRespErr::RD_KAFKA_RESP_ERR_BROKER_NOT_AVAILABLE; 50];
        cluster.request_errors(RDKafkaApiKey::Produce, &err);
        assert!(writer
            .write(vec![message.clone(), message.clone()])
            .await
            .is_err());

        cluster.clear_request_errors(RDKafkaApiKey::Produce);
        writer.close().await.expect("failed to close writer");
        assert!(matches!(
            writer.write(vec![message]).await,
            Err(BrokerError::Closed)
        ));
    }
}
