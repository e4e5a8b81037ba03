use async_trait::async_trait;
use bridge_common::Message;
use tracing::info;

/// Receives every message read by the consumer loop, one at a time.
#[async_trait]
pub trait MessageProcessor: Send {
    async fn process(&mut self, message: Message);
}

/// Writes each payload to the operational log.
pub struct LogProcessor;

#[async_trait]
impl MessageProcessor for LogProcessor {
    async fn process(&mut self, message: Message) {
        info!("Received: {}", message.value_lossy());
    }
}

#[async_trait]
impl<F> MessageProcessor for F
where
    F: FnMut(Message) + Send,
{
    async fn process(&mut self, message: Message) {
        self(message)
    }
}
