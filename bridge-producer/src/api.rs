use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bridge_common::BrokerError;
use thiserror::Error;

/// Everything that can go wrong while handling a `/send` request. The display
/// text is the response body.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Invalid request method")]
    InvalidMethod,
    #[error("Message parameter is required")]
    MissingMessage,
    #[error("failed to parse request: {0}")]
    RequestParsingError(String),

    #[error("Failed to send message: {0}")]
    SendFailed(#[from] BrokerError),
}

impl BridgeError {
    /// Label used for the rejected requests counter, `None` for broker failures.
    pub fn rejection_reason(&self) -> Option<&'static str> {
        match self {
            BridgeError::InvalidMethod => Some("method"),
            BridgeError::MissingMessage => Some("missing_message"),
            BridgeError::RequestParsingError(_) => Some("parse"),
            BridgeError::SendFailed(_) => None,
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        match self {
            BridgeError::InvalidMethod => (StatusCode::METHOD_NOT_ALLOWED, self.to_string()),

            BridgeError::MissingMessage | BridgeError::RequestParsingError(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }

            BridgeError::SendFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        }
        .into_response()
    }
}
