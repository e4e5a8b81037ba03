use async_trait::async_trait;
use rdkafka::error::KafkaError;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::message::Message;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("{0}")]
    Kafka(#[from] KafkaError),
    #[error("failed to produce to kafka (timeout)")]
    DeliveryCanceled,
    #[error("read interrupted by shutdown")]
    Interrupted,
    #[error("received empty payload")]
    EmptyPayload,
    #[error("broker client is closed")]
    Closed,
}

impl BrokerError {
    /// True when the failure is the consequence of a cancellation request,
    /// rather than of the broker itself.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, BrokerError::Interrupted)
    }
}

/// Write side of a broker connection, bound to a single topic.
///
/// Implementations are shared between concurrent request handlers, so `write`
/// takes `&self` and must be safe to call from several tasks at once.
#[async_trait]
pub trait MessageWriter {
    /// Sends all `messages` and waits for the broker to acknowledge them.
    /// Fails if any of them was not acknowledged. Whether the broker applies
    /// a multi-message write atomically is up to the broker.
    async fn write(&self, messages: Vec<Message>) -> Result<(), BrokerError>;

    /// Flushes pending deliveries and releases the connection.
    /// Must be called once per writer; later writes fail with `Closed`.
    async fn close(&self) -> Result<(), BrokerError>;
}

/// Read side of a broker connection, bound to a topic and a consumer group.
#[async_trait]
pub trait MessageReader: Send {
    /// Waits for the next message. Returns `BrokerError::Interrupted` as soon
    /// as `cancel` is triggered, even if a message is also ready.
    async fn read(&mut self, cancel: &CancellationToken) -> Result<Message, BrokerError>;

    /// Releases the subscription. Consumes the reader, so it runs at most once;
    /// a reader dropped without `close` still frees its connection.
    async fn close(self) -> Result<(), BrokerError>
    where
        Self: Sized;
}

#[cfg(test)]
mod tests {
    use rdkafka::error::RDKafkaErrorCode;

    use super::*;

    #[test]
    fn only_interrupted_counts_as_cancellation() {
        assert!(BrokerError::Interrupted.is_interrupted());
        assert!(!BrokerError::EmptyPayload.is_interrupted());
        assert!(!BrokerError::Closed.is_interrupted());
        assert!(!BrokerError::Kafka(KafkaError::MessageConsumption(
            RDKafkaErrorCode::BrokerTransportFailure
        ))
        .is_interrupted());
    }

    #[test]
    fn kafka_errors_display_verbatim() {
        let inner = KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull);
        let expected = inner.to_string();
        assert_eq!(BrokerError::from(inner).to_string(), expected);
    }
}
