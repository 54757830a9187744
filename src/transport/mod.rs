//! HTTP transport layer for the Bot API client.
//!
//! Sends one encoded request and turns the response envelope into either the
//! `result` value or a classified error.

use crate::encoding::{EncodedBody, RequestBody, UploadError};
use crate::errors::{
    ApiError, NetworkError, RequestError, ResponseError, TelegramError, TelegramResult,
};
use crate::observability::redact_url;
use crate::types::ResponseParameters;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use http::header::{CONTENT_TYPE, RETRY_AFTER};
use http::{HeaderMap, HeaderValue, StatusCode};
use reqwest::{Client, ClientBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default cap on accepted response bodies
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024;

/// HTTP transport trait for making API requests
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send a request and return the envelope's `result`
    async fn send(&self, request: HttpRequest) -> TelegramResult<Value>;
}

/// One API method call, ready to send
#[derive(Debug)]
pub struct HttpRequest {
    /// API method name, e.g. `sendMessage`
    pub method: String,
    /// Full URL, including the bot token
    pub url: String,
    /// Extra request headers
    pub headers: HeaderMap,
    /// Encoded body
    pub body: EncodedBody,
    /// Request timeout
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Create a new POST request
    pub fn post(method: impl Into<String>, url: impl Into<String>, body: EncodedBody) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: HeaderMap::new(),
            body,
            timeout: None,
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Response envelope shared by every method
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Whether the call succeeded
    pub ok: bool,
    /// Method result on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error code on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Structured failure hints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ResponseParameters>,
}

impl ApiResponse {
    /// A successful envelope
    pub fn success(result: Value) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error_code: None,
            description: None,
            parameters: None,
        }
    }

    /// A failed envelope
    pub fn failure(code: i64, description: impl Into<String>) -> Self {
        Self {
            ok: false,
            result: None,
            error_code: Some(code),
            description: Some(description.into()),
            parameters: None,
        }
    }

    /// Attach failure hints
    pub fn with_parameters(mut self, parameters: ResponseParameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Convert into the `result` value or an [`ApiError`]
    ///
    /// `status` supplies the error code when the body carries none; the
    /// `Retry-After` header is consulted only when the body has no hint.
    pub fn into_result(self, status: StatusCode, header_retry_after: Option<Duration>) -> TelegramResult<Value> {
        if self.ok {
            return self
                .result
                .ok_or(TelegramError::Response(ResponseError::MissingResult));
        }

        let code = self.error_code.unwrap_or_else(|| i64::from(status.as_u16()));
        let description = self
            .description
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());
        let parameters = self.parameters.unwrap_or_default();
        let retry_after = parameters
            .retry_after
            .map(Duration::from_secs)
            .or(header_retry_after);

        Err(TelegramError::Api(
            ApiError::new(code, description)
                .with_retry_after(retry_after)
                .with_migrate_to(parameters.migrate_to_chat_id),
        ))
    }
}

/// Retry hint from the `Retry-After` header, in whole seconds
pub fn retry_after_header(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Parse a raw response into the `result` value or a classified error
///
/// A body that is not an envelope is a deserialization error, unless the
/// status is 429 or 5xx, in which case it becomes an [`ApiError`] with the
/// status as its code so the failure stays retryable.
pub fn parse_response(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> TelegramResult<Value> {
    let header_retry_after = retry_after_header(headers);

    match serde_json::from_slice::<ApiResponse>(body) {
        Ok(envelope) => envelope.into_result(status, header_retry_after),
        Err(e) if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS => {
            debug!(status = %status, error = %e, "Non-envelope error response");
            let description = status.canonical_reason().unwrap_or("Server error");
            Err(TelegramError::Api(
                ApiError::new(i64::from(status.as_u16()), description)
                    .with_retry_after(header_retry_after),
            ))
        }
        Err(e) => Err(TelegramError::Response(ResponseError::DeserializationError {
            message: e.to_string(),
        })),
    }
}

/// Default HTTP transport implementation using reqwest
pub struct ReqwestTransport {
    client: Client,
    default_timeout: Duration,
    max_response_bytes: usize,
}

impl ReqwestTransport {
    /// Create a new transport with the given timeout
    pub fn new(timeout: Duration, max_response_bytes: usize) -> TelegramResult<Self> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| TelegramError::Network(NetworkError::Http(e.to_string())))?;

        Ok(Self::with_client(client, timeout, max_response_bytes))
    }

    /// Create a new transport with a pre-built client
    pub fn with_client(client: Client, default_timeout: Duration, max_response_bytes: usize) -> Self {
        Self {
            client,
            default_timeout,
            max_response_bytes,
        }
    }

    /// Read the body, rejecting it once it exceeds the configured limit
    async fn read_body(&self, mut response: Response) -> TelegramResult<Bytes> {
        let limit = self.max_response_bytes;
        if response
            .content_length()
            .is_some_and(|len| len > limit as u64)
        {
            return Err(TelegramError::Response(ResponseError::BodyTooLarge { limit }));
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(NetworkError::from)? {
            if body.len() + chunk.len() > limit {
                warn!(limit, "Response body exceeds limit");
                return Err(TelegramError::Response(ResponseError::BodyTooLarge { limit }));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body.freeze())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    #[instrument(
        skip(self, request),
        fields(method = %request.method, url = %redact_url(&request.url), multipart = request.body.is_multipart())
    )]
    async fn send(&self, request: HttpRequest) -> TelegramResult<Value> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);
        let content_type = HeaderValue::from_str(&request.body.content_type).map_err(|e| {
            TelegramError::Network(NetworkError::Http(format!("invalid content type: {}", e)))
        })?;

        let body = match request.body.body {
            RequestBody::Bytes(bytes) => reqwest::Body::from(bytes),
            RequestBody::Stream(stream) => reqwest::Body::wrap_stream(stream),
        };

        let response = self
            .client
            .post(&request.url)
            .headers(request.headers)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(send_error)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = self.read_body(response).await?;

        debug!(status = %status, bytes = body.len(), "Received response");

        parse_response(status, &headers, &body)
    }
}

/// Map a failed exchange, keeping local upload failures out of the network class
fn send_error(error: reqwest::Error) -> TelegramError {
    match UploadError::find(&error) {
        Some(upload) => {
            debug!(error = %upload, "Upload source failed during send");
            TelegramError::Request(RequestError::from(upload))
        }
        None => TelegramError::Network(NetworkError::from(error)),
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("default_timeout", &self.default_timeout)
            .field("max_response_bytes", &self.max_response_bytes)
            .finish()
    }
}
