use std::sync::Arc;

use bridge_common::test::RecordingWriter;
use bridge_common::Message;
use bridge_producer::server::serve_with_writer;
use reqwest::StatusCode;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

#[tokio::test]
async fn serves_until_shutdown_then_closes_the_writer_once() {
    let writer = RecordingWriter::new();
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind");
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server = tokio::spawn(serve_with_writer(
        Arc::new(writer.clone()),
        false,
        listener,
        async move {
            shutdown_rx.await.ok();
        },
    ));

    let client = reqwest::Client::new();
    for message in ["first", "second"] {
        let res = client
            .post(format!("http://{addr}/send"))
            .form(&[("message", message)])
            .send()
            .await
            .expect("failed to send request");
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.text().await.unwrap(), format!("Message sent: {message}"));
    }
    assert_eq!(writer.close_count(), 0);
    drop(client);

    shutdown_tx.send(()).unwrap();
    server
        .await
        .expect("server task panicked")
        .expect("server failed");

    assert_eq!(
        writer.writes(),
        vec![vec![Message::new("first")], vec![Message::new("second")]]
    );
    assert_eq!(writer.close_count(), 1);
}
