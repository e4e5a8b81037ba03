use bridge_common::MessageReader;
use metrics::counter;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::processor::MessageProcessor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Running,
    ShuttingDown,
    Stopped,
}

/// What a finished consumer loop did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerReport {
    pub processed: u64,
    pub read_errors: u64,
    pub state: ConsumerState,
}

/// Reads messages one at a time and hands them to a processor until shutdown
/// is requested. The loop owns the reader and closes it when it stops.
pub struct ConsumerLoop<R, P> {
    reader: R,
    processor: P,
    state: ConsumerState,
    processed: u64,
    read_errors: u64,
}

impl<R, P> ConsumerLoop<R, P>
where
    R: MessageReader,
    P: MessageProcessor,
{
    pub fn new(reader: R, processor: P) -> Self {
        Self {
            reader,
            processor,
            state: ConsumerState::Running,
            processed: 0,
            read_errors: 0,
        }
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    /// Runs until a read fails because `shutdown` was cancelled. Other read
    /// errors are logged and skipped. The reader is closed before returning.
    pub async fn run(mut self, shutdown: CancellationToken) -> ConsumerReport {
        info!("consumer loop running");

        while self.state == ConsumerState::Running {
            match self.reader.read(&shutdown).await {
                Ok(message) => {
                    self.processor.process(message).await;
                    self.processed += 1;
                    counter!("bridge_consumer_messages_processed_total").increment(1);
                }
                Err(err) if err.is_interrupted() || shutdown.is_cancelled() => {
                    info!("shutdown requested, leaving consumer loop");
                    self.state = ConsumerState::ShuttingDown;
                }
                Err(err) => {
                    error!("Error reading message: {}", err);
                    self.read_errors += 1;
                    counter!("bridge_consumer_read_errors_total").increment(1);
                }
            }
        }

        let ConsumerLoop {
            reader,
            processed,
            read_errors,
            ..
        } = self;
        if let Err(err) = reader.close().await {
            error!("failed to close broker reader: {}", err);
        }
        info!(processed, read_errors, "consumer loop stopped");

        ConsumerReport {
            processed,
            read_errors,
            state: ConsumerState::Stopped,
        }
    }
}
