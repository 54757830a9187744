//! Mock implementations for testing.
//!
//! [`MockHttpTransport`] replays scripted responses and records every request
//! it receives, draining streamed bodies so tests can inspect the bytes that
//! would have gone over the wire.

use crate::errors::{NetworkError, TelegramError, TelegramResult};
use crate::transport::{parse_response, ApiResponse, HttpRequest, HttpTransport};
use crate::types::ResponseParameters;
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Mock response configuration
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
    /// Response headers
    pub headers: Vec<(String, String)>,
    /// Delay before responding
    pub delay: Option<Duration>,
    /// Fail at the transport level with this message instead of responding
    pub network_error: Option<String>,
}

impl MockResponse {
    /// Create a response with a raw body
    pub fn raw(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: Vec::new(),
            delay: None,
            network_error: None,
        }
    }

    fn envelope(status: u16, envelope: &ApiResponse) -> Self {
        let body = serde_json::to_string(envelope).unwrap_or_default();
        Self::raw(status, body)
    }

    /// A successful envelope wrapping `result`
    pub fn result<T: Serialize>(result: &T) -> Self {
        let value = serde_json::to_value(result).unwrap_or(Value::Null);
        Self::envelope(200, &ApiResponse::success(value))
    }

    /// A failed envelope
    pub fn api_error(code: u16, description: &str) -> Self {
        Self::envelope(code, &ApiResponse::failure(i64::from(code), description))
    }

    /// A 429 envelope carrying a retry hint in its parameters
    pub fn rate_limited(retry_after_secs: u64) -> Self {
        let envelope = ApiResponse::failure(
            429,
            format!("Too Many Requests: retry after {}", retry_after_secs),
        )
        .with_parameters(ResponseParameters {
            retry_after: Some(retry_after_secs),
            migrate_to_chat_id: None,
        });
        Self::envelope(429, &envelope)
    }

    /// A 5xx envelope
    pub fn server_error(code: u16) -> Self {
        let reason = StatusCode::from_u16(code)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Server Error");
        Self::api_error(code, reason)
    }

    /// A transport-level failure
    pub fn network_error(message: impl Into<String>) -> Self {
        Self {
            network_error: Some(message.into()),
            ..Self::raw(0, "")
        }
    }

    /// Add a response header
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Add delay to response
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Recorded request for verification
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// API method name
    pub method: String,
    /// Request URL
    pub url: String,
    /// Content type
    pub content_type: String,
    /// Request body as sent
    pub body: Bytes,
}

impl RecordedRequest {
    /// Body as UTF-8 text (lossy)
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON, if it is JSON
    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    /// Whether the body is multipart
    pub fn is_multipart(&self) -> bool {
        self.content_type.starts_with("multipart/form-data")
    }
}

/// Mock HTTP transport for testing
#[derive(Default)]
pub struct MockHttpTransport {
    /// Queue of responses to return
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    /// Recorded requests
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    /// Default response if queue is empty
    default_response: Option<MockResponse>,
}

impl MockHttpTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a response to the queue
    pub fn add_response(self, response: MockResponse) -> Self {
        self.responses.lock().push_back(response);
        self
    }

    /// Add multiple responses
    pub fn add_responses(self, responses: impl IntoIterator<Item = MockResponse>) -> Self {
        self.responses.lock().extend(responses);
        self
    }

    /// Queue a successful result
    pub fn add_result<T: Serialize>(self, result: &T) -> Self {
        self.add_response(MockResponse::result(result))
    }

    /// Set default response when queue is empty
    pub fn with_default_response(mut self, response: MockResponse) -> Self {
        self.default_response = Some(response);
        self
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Get the last recorded request
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.lock().last().cloned()
    }

    /// Number of requests received
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Get remaining response count
    pub fn remaining_responses(&self) -> usize {
        self.responses.lock().len()
    }

    fn next_response(&self) -> Option<MockResponse> {
        self.responses
            .lock()
            .pop_front()
            .or_else(|| self.default_response.clone())
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(&self, request: HttpRequest) -> TelegramResult<Value> {
        let content_type = request.body.content_type.clone();
        let body = request
            .body
            .body
            .collect()
            .await
            .map_err(|e| TelegramError::Request(e.into()))?;

        self.requests.lock().push(RecordedRequest {
            method: request.method,
            url: request.url,
            content_type,
            body,
        });

        let response = self.next_response().ok_or_else(|| {
            TelegramError::Network(NetworkError::ConnectionFailed {
                message: "no mock response queued".to_string(),
            })
        })?;

        if let Some(delay) = response.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = response.network_error {
            return Err(TelegramError::Network(NetworkError::ConnectionFailed { message }));
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &response.headers {
            if let (Ok(name), Ok(value)) = (
                name.parse::<HeaderName>(),
                HeaderValue::from_str(value),
            ) {
                headers.insert(name, value);
            }
        }
        let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK);

        parse_response(status, &headers, response.body.as_bytes())
    }
}
