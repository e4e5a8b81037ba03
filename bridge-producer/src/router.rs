use std::sync::Arc;

use axum::{
    routing::{any, get},
    Router,
};
use bridge_common::MessageWriter;
use tower_http::trace::TraceLayer;

use crate::send;

#[derive(Clone)]
pub struct State {
    pub writer: Arc<dyn MessageWriter + Send + Sync>,
}

async fn index() -> &'static str {
    "bridge-producer"
}

/// Builds the HTTP app around a single, already connected writer shared by all requests.
pub fn router<W: MessageWriter + Send + Sync + 'static>(writer: Arc<W>) -> Router {
    let state = State { writer };

    Router::new()
        .route("/", get(index))
        // Every method is routed to the handler, which answers non-POST requests itself
        .route("/send", any(send::send))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
