use std::sync::{Arc, Mutex};
use std::time::Duration;

use bridge_common::test::ScriptedReader;
use bridge_common::{BrokerError, Message};
use bridge_consumer::consumer::{ConsumerLoop, ConsumerState};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use tokio_util::sync::CancellationToken;

fn transient_error() -> BrokerError {
    BrokerError::Kafka(KafkaError::MessageConsumption(
        RDKafkaErrorCode::BrokerTransportFailure,
    ))
}

#[tokio::test]
async fn transient_errors_do_not_stop_the_loop() {
    let (reader, probe) = ScriptedReader::new(vec![
        Ok(Message::new("a")),
        Err(transient_error()),
        Ok(Message::new("b")),
    ]);
    let shutdown = CancellationToken::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let processor = {
        let seen = seen.clone();
        let shutdown = shutdown.clone();
        move |message: Message| {
            let payload = message.value_lossy().into_owned();
            // Stop once the last scripted message went through
            if payload == "b" {
                shutdown.cancel();
            }
            seen.lock().unwrap().push(payload);
        }
    };

    let report = ConsumerLoop::new(reader, processor).run(shutdown).await;

    assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
    assert_eq!(report.processed, 2);
    assert_eq!(report.read_errors, 1);
    assert_eq!(report.state, ConsumerState::Stopped);
    // a, error, b, then the read interrupted by the cancelled token
    assert_eq!(probe.reads(), 4);
    assert_eq!(probe.closes(), 1);
}

#[tokio::test]
async fn cancelling_an_idle_consumer_releases_the_reader_once() {
    let (reader, probe) = ScriptedReader::new(vec![Ok(Message::new("only"))]);
    let shutdown = CancellationToken::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let processor = {
        let seen = seen.clone();
        move |message: Message| seen.lock().unwrap().push(message)
    };
    let consumer = tokio::spawn(ConsumerLoop::new(reader, processor).run(shutdown.clone()));

    // Wait for the loop to block on the exhausted script
    while probe.reads() < 2 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(!consumer.is_finished());

    shutdown.cancel();
    let report = tokio::time::timeout(Duration::from_secs(5), consumer)
        .await
        .expect("consumer did not stop after cancellation")
        .expect("consumer task panicked");

    assert_eq!(*seen.lock().unwrap(), vec![Message::new("only")]);
    assert_eq!(report.processed, 1);
    assert_eq!(report.read_errors, 0);
    assert_eq!(report.state, ConsumerState::Stopped);
    assert_eq!(probe.reads(), 2, "no read may be issued after the interrupted one");
    assert_eq!(probe.closes(), 1);
}

#[tokio::test]
async fn close_failures_do_not_prevent_stopping() {
    let (reader, probe) = ScriptedReader::new(vec![]);
    let reader = reader.failing_close(transient_error());
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let report = ConsumerLoop::new(reader, |_: Message| {}).run(shutdown).await;

    assert_eq!(report.state, ConsumerState::Stopped);
    assert_eq!(probe.closes(), 1);
}
