use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderMap, Method};
use bridge_common::Message;
use bytes::Bytes;
use metrics::counter;
use tracing::{debug, error, instrument};

use crate::api::BridgeError;
use crate::router;

const MESSAGE_FIELD: &str = "message";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// `/send`: forwards the `message` field of a POST request to the broker as a
/// single keyless message, and echoes it back once the broker acknowledged it.
#[instrument(skip_all, fields(method = %method))]
pub async fn send(
    State(state): State<router::State>,
    method: Method,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<String, BridgeError> {
    let payload =
        extract_message(&method, &headers, query.as_deref(), &body).inspect_err(|err| {
            if let Some(reason) = err.rejection_reason() {
                counter!("bridge_requests_rejected_total", "reason" => reason).increment(1);
            }
        })?;
    debug!("forwarding message of {} bytes", payload.len());

    if let Err(err) = state
        .writer
        .write(vec![Message::new(payload.clone())])
        .await
    {
        error!("failed to send message: {}", err);
        counter!("bridge_send_errors_total").increment(1);
        return Err(BridgeError::SendFailed(err));
    }

    counter!("bridge_messages_sent_total").increment(1);
    Ok(format!("Message sent: {payload}"))
}

/// Validates the request and returns the non-empty `message` value. Form body
/// values come before query string values, and the first one found wins.
fn extract_message(
    method: &Method,
    headers: &HeaderMap,
    query: Option<&str>,
    body: &[u8],
) -> Result<String, BridgeError> {
    if *method != Method::POST {
        return Err(BridgeError::InvalidMethod);
    }

    let from_body = if is_form(headers) {
        first_value(body, MESSAGE_FIELD)?
    } else {
        None
    };
    let from_query = match query {
        Some(query) => first_value(query.as_bytes(), MESSAGE_FIELD)?,
        None => None,
    };

    match from_body.or(from_query) {
        Some(message) if !message.is_empty() => Ok(message),
        _ => Err(BridgeError::MissingMessage),
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}

/// Looks up `field` in an urlencoded input, rejecting malformed input instead of
/// decoding it lossily.
fn first_value(input: &[u8], field: &str) -> Result<Option<String>, BridgeError> {
    let text = std::str::from_utf8(input)
        .map_err(|e| BridgeError::RequestParsingError(format!("invalid UTF-8: {e}")))?;
    check_escapes(text)?;

    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(text)
        .map_err(|e| BridgeError::RequestParsingError(e.to_string()))?;

    Ok(pairs
        .into_iter()
        .find(|(key, _)| key == field)
        .map(|(_, value)| value))
}

/// Every `%` must start a two hex digit escape sequence.
fn check_escapes(text: &str) -> Result<(), BridgeError> {
    let bytes = text.as_bytes();
    for (i, _) in text.match_indices('%') {
        let escape = bytes.get(i + 1..i + 3);
        if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
            let end = (i + 3).min(bytes.len());
            return Err(BridgeError::RequestParsingError(format!(
                "invalid URL escape {:?}",
                String::from_utf8_lossy(&bytes[i..end])
            )));
        }
    }
    Ok(())
}
