//! HTTP plumbing shared by the directions providers

use reqwest::{RequestBuilder, StatusCode};
use tracing::debug;

use crate::error::RoutingError;

/// Map a non-success status to the error taxonomy
pub fn classify_status(status: StatusCode, body: &str) -> RoutingError {
    let message = format!("HTTP {}: {}", status.as_u16(), truncate(body, 200));

    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        RoutingError::TransientProvider(message)
    } else {
        RoutingError::PermanentProvider(message)
    }
}

/// Transport failures (timeout, refused connection, reset) are all retryable.
/// A request that cannot be built (e.g. a key that is not a valid header
/// value) or a body that cannot be decoded is not.
pub fn classify_transport(err: &reqwest::Error) -> RoutingError {
    if err.is_builder() {
        RoutingError::PermanentProvider(format!("invalid request: {}", err))
    } else if err.is_decode() {
        RoutingError::PermanentProvider(format!("undecodable response: {}", err))
    } else {
        RoutingError::TransientProvider(format!("request failed: {}", err))
    }
}

/// Send the request and return the body of a 2xx response
pub async fn send_for_body(request: RequestBuilder) -> Result<String, RoutingError> {
    let response = request.send().await.map_err(|e| classify_transport(&e))?;
    let status = response.status();

    let body = response.text().await.map_err(|e| classify_transport(&e))?;
    debug!("Directions provider answered {} ({} bytes)", status, body.len());

    if !status.is_success() {
        return Err(classify_status(status, &body));
    }

    Ok(body)
}

fn truncate(body: &str, max_chars: usize) -> &str {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
