//! Error types for the Telegram client.
//!
//! Provides an error hierarchy mapping Bot API failures to semantic error
//! types with retry and circuit breaker support. Wrapped errors keep their
//! cause reachable through [`std::error::Error::source`] and through
//! [`TelegramError::root_cause`], so callers can ask "is this a rate limit"
//! without matching on message text.

use crate::encoding::UploadError;
use std::time::Duration;
use thiserror::Error;

/// Result type for Telegram operations
pub type TelegramResult<T> = Result<T, TelegramError>;

/// Root error type for the Telegram integration
#[derive(Error, Debug)]
pub enum TelegramError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Request could not be encoded
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// The Bot API answered with `ok: false`
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Response could not be read or parsed
    #[error("Response error: {0}")]
    Response(#[from] ResponseError),

    /// The circuit breaker rejected the call without contacting the API
    #[error("Circuit breaker is open")]
    CircuitOpen,

    /// The caller cancelled the call
    #[error("Call was cancelled")]
    Cancelled,

    /// The caller's deadline elapsed
    #[error("Call deadline exceeded")]
    DeadlineExceeded,

    /// Every attempt failed with a retryable error
    #[error("Max retries exceeded after {attempts} attempts: {last}")]
    MaxRetriesExceeded {
        /// Total number of attempts made
        attempts: u32,
        /// Error returned by the final attempt
        #[source]
        last: Box<TelegramError>,
    },
}

impl TelegramError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "TELEGRAM_CONFIG",
            Self::Request(_) => "TELEGRAM_REQUEST",
            Self::Api(_) => "TELEGRAM_API",
            Self::Network(_) => "TELEGRAM_NETWORK",
            Self::Response(_) => "TELEGRAM_RESPONSE",
            Self::CircuitOpen => "TELEGRAM_CIRCUIT_OPEN",
            Self::Cancelled => "TELEGRAM_CANCELLED",
            Self::DeadlineExceeded => "TELEGRAM_DEADLINE",
            Self::MaxRetriesExceeded { .. } => "TELEGRAM_MAX_RETRIES",
        }
    }

    /// Follow `MaxRetriesExceeded` wrappers down to the underlying failure
    pub fn root_cause(&self) -> &TelegramError {
        let mut current = self;
        while let Self::MaxRetriesExceeded { last, .. } = current {
            current = last;
        }
        current
    }

    /// The classified API condition behind this error, if any
    pub fn api_kind(&self) -> Option<ApiErrorKind> {
        match self.root_cause() {
            Self::Api(err) => Some(err.kind),
            _ => None,
        }
    }

    /// The API error behind this error, if any
    pub fn api_error(&self) -> Option<&ApiError> {
        match self.root_cause() {
            Self::Api(err) => Some(err),
            _ => None,
        }
    }

    /// Whether the caller's cancellation or deadline ended the call
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root_cause(), Self::Cancelled | Self::DeadlineExceeded)
    }

    /// Whether the circuit breaker rejected the call
    pub fn is_circuit_open(&self) -> bool {
        matches!(self.root_cause(), Self::CircuitOpen)
    }

    /// Whether the retry budget was exhausted
    pub fn is_max_retries_exceeded(&self) -> bool {
        matches!(self, Self::MaxRetriesExceeded { .. })
    }

    /// Whether the API throttled the call (429)
    pub fn is_rate_limited(&self) -> bool {
        self.api_kind() == Some(ApiErrorKind::TooManyRequests)
    }

    /// Whether the failure reflects remote service degradation
    ///
    /// Only server-side API errors and transport failures qualify.
    pub fn is_service_failure(&self) -> bool {
        match self {
            Self::Api(err) => err.is_server_error(),
            Self::Network(_) => true,
            _ => false,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api(err) => err.kind == ApiErrorKind::TooManyRequests || err.is_server_error(),
            Self::Network(_) => true,
            _ => false,
        }
    }

    /// Get the server-supplied retry hint if applicable
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Api(err) => err.retry_after,
            _ => None,
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigurationError {
    /// Missing token
    #[error("Bot token is missing")]
    MissingToken,

    /// Invalid token format
    #[error("Invalid token format: {0}")]
    InvalidToken(String),

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Error message
        message: String,
    },

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(String),
}

/// Request encoding errors
#[derive(Error, Debug)]
pub enum RequestError {
    /// Payload could not be serialized
    #[error("Failed to serialize payload: {message}")]
    Serialization {
        /// Error message
        message: String,
    },

    /// Payload is structurally invalid
    #[error("Invalid payload: {message}")]
    InvalidPayload {
        /// Error message
        message: String,
    },

    /// Upload source could not be opened
    #[error("Failed to open upload '{name}': {message}")]
    UploadSource {
        /// File name of the upload
        name: String,
        /// Error message
        message: String,
    },
}

impl From<UploadError> for RequestError {
    fn from(err: UploadError) -> Self {
        RequestError::UploadSource {
            name: err.name,
            message: err.source.to_string(),
        }
    }
}

impl From<&UploadError> for RequestError {
    fn from(err: &UploadError) -> Self {
        RequestError::UploadSource {
            name: err.name.clone(),
            message: err.source.to_string(),
        }
    }
}

impl From<serde_json::Error> for RequestError {
    fn from(err: serde_json::Error) -> Self {
        RequestError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Classified Bot API failure conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// The recipient blocked the bot
    BotBlocked,
    /// Chat does not exist or the bot cannot see it
    ChatNotFound,
    /// User does not exist or is deactivated
    UserNotFound,
    /// Message to act on does not exist
    MessageNotFound,
    /// Edit would not change the message
    MessageNotModified,
    /// Bot lacks the rights for the action
    NotEnoughRights,
    /// Throttled by the API (429)
    TooManyRequests,
    /// Token rejected (401)
    Unauthorized,
    /// Other 403 rejection
    Forbidden,
    /// Group was upgraded to a supergroup
    ChatMigrated,
    /// Conflicting update consumer or webhook (409)
    Conflict,
    /// Server-side failure (5xx)
    ServerError,
    /// Unclassified failure
    Other,
}

impl ApiErrorKind {
    /// Classify a failure from its error code and description
    pub fn classify(code: i64, description: &str) -> Self {
        let text = description.to_ascii_lowercase();

        if code == 429 || text.contains("too many requests") {
            return Self::TooManyRequests;
        }
        if code >= 500 {
            return Self::ServerError;
        }
        if text.contains("bot was blocked by the user") {
            return Self::BotBlocked;
        }
        if text.contains("chat not found") {
            return Self::ChatNotFound;
        }
        if text.contains("user not found") || text.contains("user is deactivated") {
            return Self::UserNotFound;
        }
        if text.contains("message to edit not found")
            || text.contains("message to delete not found")
            || text.contains("message to forward not found")
            || text.contains("message not found")
        {
            return Self::MessageNotFound;
        }
        if text.contains("message is not modified") {
            return Self::MessageNotModified;
        }
        if text.contains("not enough rights") || text.contains("have no rights") {
            return Self::NotEnoughRights;
        }
        if text.contains("upgraded to a supergroup") {
            return Self::ChatMigrated;
        }

        match code {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            409 => Self::Conflict,
            _ => Self::Other,
        }
    }
}

/// Failure reported by the Bot API envelope
#[derive(Error, Debug, Clone)]
#[error("{code} - {description}")]
pub struct ApiError {
    /// Error code (mirrors the HTTP status)
    pub code: i64,
    /// Human-readable description
    pub description: String,
    /// Classified condition
    pub kind: ApiErrorKind,
    /// Server-supplied retry hint
    pub retry_after: Option<Duration>,
    /// Replacement chat id after a supergroup migration
    pub migrate_to_chat_id: Option<i64>,
}

impl ApiError {
    /// Create an API error, classifying it from code and description
    pub fn new(code: i64, description: impl Into<String>) -> Self {
        let description = description.into();
        Self {
            kind: ApiErrorKind::classify(code, &description),
            code,
            description,
            retry_after: None,
            migrate_to_chat_id: None,
        }
    }

    /// Attach a retry hint
    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    /// Attach a migration target
    pub fn with_migrate_to(mut self, chat_id: Option<i64>) -> Self {
        self.migrate_to_chat_id = chat_id;
        if chat_id.is_some() {
            self.kind = ApiErrorKind::ChatMigrated;
        }
        self
    }

    /// 5xx-class failure
    pub fn is_server_error(&self) -> bool {
        self.code >= 500
    }

    /// 4xx-class failure
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.code)
    }
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Connection failed
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        /// Error message
        message: String,
    },

    /// Request timeout
    #[error("Request timed out")]
    Timeout,

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NetworkError::Timeout
        } else if err.is_connect() {
            NetworkError::ConnectionFailed {
                message: err.to_string(),
            }
        } else {
            NetworkError::Http(err.to_string())
        }
    }
}

/// Response parsing errors
#[derive(Error, Debug)]
pub enum ResponseError {
    /// JSON deserialization error
    #[error("Deserialization error: {message}")]
    DeserializationError {
        /// Error message
        message: String,
    },

    /// Body exceeded the configured limit
    #[error("Response body exceeds {limit} bytes")]
    BodyTooLarge {
        /// Configured limit in bytes
        limit: usize,
    },

    /// Envelope reported success without a result
    #[error("Missing 'result' field in response")]
    MissingResult,
}

impl From<serde_json::Error> for ResponseError {
    fn from(err: serde_json::Error) -> Self {
        ResponseError::DeserializationError {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use test_case::test_case;

    #[test_case(400, "Bad Request: chat not found", ApiErrorKind::ChatNotFound)]
    #[test_case(403, "Forbidden: bot was blocked by the user", ApiErrorKind::BotBlocked)]
    #[test_case(429, "Too Many Requests: retry after 5", ApiErrorKind::TooManyRequests)]
    #[test_case(400, "Bad Request: message is not modified", ApiErrorKind::MessageNotModified)]
    #[test_case(400, "Bad Request: message to edit not found", ApiErrorKind::MessageNotFound)]
    #[test_case(401, "Unauthorized", ApiErrorKind::Unauthorized)]
    #[test_case(409, "Conflict: terminated by other getUpdates request", ApiErrorKind::Conflict)]
    #[test_case(502, "Bad Gateway", ApiErrorKind::ServerError)]
    #[test_case(400, "Bad Request: wrong file identifier", ApiErrorKind::Other)]
    fn test_classify(code: i64, description: &str, expected: ApiErrorKind) {
        assert_eq!(ApiErrorKind::classify(code, description), expected);
    }

    #[test]
    fn test_error_is_retryable() {
        assert!(TelegramError::Network(NetworkError::Timeout).is_retryable());
        assert!(TelegramError::Api(ApiError::new(429, "Too Many Requests")).is_retryable());
        assert!(TelegramError::Api(ApiError::new(500, "Internal Server Error")).is_retryable());

        assert!(!TelegramError::Api(ApiError::new(400, "Bad Request: chat not found")).is_retryable());
        assert!(!TelegramError::CircuitOpen.is_retryable());
        assert!(!TelegramError::Cancelled.is_retryable());
    }

    #[test]
    fn test_service_failure_excludes_client_errors() {
        assert!(TelegramError::Api(ApiError::new(503, "Service Unavailable")).is_service_failure());
        assert!(TelegramError::Network(NetworkError::Timeout).is_service_failure());

        assert!(!TelegramError::Api(ApiError::new(429, "Too Many Requests")).is_service_failure());
        assert!(!TelegramError::DeadlineExceeded.is_service_failure());
    }

    #[test]
    fn test_upload_failure_is_a_local_error() {
        let upload = UploadError {
            name: "report.csv".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let err = TelegramError::Request(RequestError::from(upload));

        assert!(!err.is_retryable());
        assert!(!err.is_service_failure());
        assert!(matches!(
            err,
            TelegramError::Request(RequestError::UploadSource { ref name, .. }) if name == "report.csv"
        ));
    }

    #[test]
    fn test_max_retries_preserves_cause() {
        let err = TelegramError::MaxRetriesExceeded {
            attempts: 4,
            last: Box::new(TelegramError::Api(
                ApiError::new(429, "Too Many Requests: retry after 1")
                    .with_retry_after(Some(Duration::from_secs(1))),
            )),
        };

        assert!(err.is_max_retries_exceeded());
        assert!(err.is_rate_limited());
        assert_eq!(err.api_kind(), Some(ApiErrorKind::TooManyRequests));

        let source = err.source().and_then(|s| s.downcast_ref::<TelegramError>());
        assert!(matches!(source, Some(TelegramError::Api(_))));
    }

    #[test]
    fn test_migration_overrides_kind() {
        let err = ApiError::new(400, "Bad Request: group chat was upgraded to a supergroup chat")
            .with_migrate_to(Some(-1001234));
        assert_eq!(err.kind, ApiErrorKind::ChatMigrated);
        assert_eq!(err.migrate_to_chat_id, Some(-1001234));
    }
}
