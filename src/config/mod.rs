//! Configuration management for the Bot API client.
//!
//! Supports configuration via:
//! - Explicit values
//! - Environment variables
//! - Builder pattern

use crate::errors::{ConfigurationError, TelegramError, TelegramResult};
use crate::resilience::{
    CircuitBreakerConfig, RateLimiterConfig, ResilienceOrchestratorConfig, RetryConfig,
};
use crate::transport::DEFAULT_MAX_RESPONSE_BYTES;
use http::HeaderMap;
use secrecy::{ExposeSecret, SecretString};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Secure wrapper for bot tokens (`<bot id>:<secret>`)
#[derive(Clone)]
pub struct BotToken {
    token: SecretString,
    bot_id: u64,
}

impl BotToken {
    /// Create a new token, validating its shape
    pub fn new(token: impl Into<String>) -> Result<Self, ConfigurationError> {
        let token = token.into();
        let (id, secret) = token.split_once(':').ok_or_else(|| {
            ConfigurationError::InvalidToken("Token must look like <bot id>:<secret>".to_string())
        })?;

        let bot_id = id
            .parse::<u64>()
            .map_err(|_| ConfigurationError::InvalidToken("Bot id must be numeric".to_string()))?;

        if secret.is_empty()
            || !secret
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigurationError::InvalidToken(
                "Token secret contains invalid characters".to_string(),
            ));
        }

        Ok(Self {
            token: SecretString::new(token),
            bot_id,
        })
    }

    /// The numeric bot id (the public part of the token)
    pub fn bot_id(&self) -> u64 {
        self.bot_id
    }

    /// Expose the token for use in request URLs
    pub(crate) fn expose(&self) -> &str {
        self.token.expose_secret()
    }
}

impl std::fmt::Debug for BotToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BotToken({}:[REDACTED])", self.bot_id)
    }
}

/// Configuration for the Bot API client
#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot token
    pub(crate) token: Option<BotToken>,
    /// Base URL for API requests
    pub base_url: String,
    /// Per-attempt request timeout
    pub timeout: Duration,
    /// Largest accepted response body; larger bodies are rejected
    pub max_response_bytes: usize,
    /// Default headers
    pub default_headers: HeaderMap,
    /// Retry, circuit breaker, and rate limiter settings
    pub resilience: ResilienceOrchestratorConfig,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &self.token)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_response_bytes", &self.max_response_bytes)
            .field("resilience", &self.resilience)
            .finish()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: crate::DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(crate::DEFAULT_TIMEOUT_SECS),
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            default_headers: HeaderMap::new(),
            resilience: ResilienceOrchestratorConfig::default()
                .retry(RetryConfig::default().max_retries(crate::DEFAULT_MAX_RETRIES)),
        }
    }
}

impl TelegramConfig {
    /// Create a new configuration builder
    pub fn builder() -> TelegramConfigBuilder {
        TelegramConfigBuilder::new()
    }

    /// Create configuration from environment variables
    ///
    /// Reads `TELEGRAM_BOT_TOKEN`, `TELEGRAM_API_URL`, `TELEGRAM_TIMEOUT`
    /// (seconds), `TELEGRAM_MAX_RETRIES` and `TELEGRAM_MAX_RESPONSE_BYTES`.
    pub fn from_env() -> TelegramResult<Self> {
        let mut builder = TelegramConfigBuilder::new();

        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            builder = builder.token(&token)?;
        }

        if let Ok(url) = std::env::var("TELEGRAM_API_URL") {
            builder = builder.base_url(&url)?;
        }

        if let Some(secs) = env_number::<u64>("TELEGRAM_TIMEOUT")? {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        if let Some(n) = env_number::<u32>("TELEGRAM_MAX_RETRIES")? {
            builder = builder.max_retries(n);
        }

        if let Some(n) = env_number::<usize>("TELEGRAM_MAX_RESPONSE_BYTES")? {
            builder = builder.max_response_bytes(n);
        }

        builder.build()
    }

    /// Get the bot token if available
    pub fn token(&self) -> Option<&BotToken> {
        self.token.as_ref()
    }

    /// Build the full URL for an API method
    pub fn method_url(&self, method: &str) -> TelegramResult<String> {
        let token = self
            .token
            .as_ref()
            .ok_or(TelegramError::Configuration(ConfigurationError::MissingToken))?;
        let base = self.base_url.trim_end_matches('/');
        Ok(format!(
            "{}/bot{}/{}",
            base,
            token.expose(),
            method.trim_start_matches('/')
        ))
    }

    /// Validate the configuration
    pub fn validate(&self) -> TelegramResult<()> {
        if self.token.is_none() {
            return Err(TelegramError::Configuration(ConfigurationError::MissingToken));
        }

        Url::parse(&self.base_url).map_err(|e| invalid(format!("Invalid URL: {}", e)))?;

        if self.max_response_bytes == 0 {
            return Err(invalid("max_response_bytes must be positive".to_string()).into());
        }

        let breaker = &self.resilience.circuit_breaker;
        if !(breaker.failure_ratio > 0.0 && breaker.failure_ratio <= 1.0) {
            return Err(invalid("failure_ratio must be in (0, 1]".to_string()).into());
        }
        if breaker.half_open_max_requests == 0 {
            return Err(invalid("half_open_max_requests must be positive".to_string()).into());
        }

        let retry = &self.resilience.retry;
        if retry.multiplier < 1.0 {
            return Err(invalid("retry multiplier must be at least 1".to_string()).into());
        }

        self.resilience
            .rate_limiter
            .validate()
            .map_err(|message| invalid(message).into())
    }
}

fn invalid(message: String) -> ConfigurationError {
    ConfigurationError::InvalidConfiguration { message }
}

fn env_number<T: FromStr>(name: &str) -> Result<Option<T>, ConfigurationError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigurationError::EnvVar(format!("{} is not a valid number", name))),
        Err(_) => Ok(None),
    }
}

/// Builder for TelegramConfig
#[derive(Default)]
pub struct TelegramConfigBuilder {
    config: TelegramConfig,
}

impl TelegramConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: TelegramConfig::default(),
        }
    }

    /// Set the bot token
    pub fn token(mut self, token: &str) -> Result<Self, ConfigurationError> {
        self.config.token = Some(BotToken::new(token)?);
        Ok(self)
    }

    /// Set the base URL
    pub fn base_url(mut self, url: &str) -> Result<Self, ConfigurationError> {
        Url::parse(url).map_err(|e| invalid(format!("Invalid URL: {}", e)))?;
        self.config.base_url = url.to_string();
        Ok(self)
    }

    /// Set the per-attempt timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the maximum retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.resilience.retry.max_retries = retries;
        self
    }

    /// Set the response size limit
    pub fn max_response_bytes(mut self, bytes: usize) -> Self {
        self.config.max_response_bytes = bytes;
        self
    }

    /// Set the retry policy
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.config.resilience.retry = config;
        self
    }

    /// Set the circuit breaker policy
    pub fn circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.config.resilience.circuit_breaker = config;
        self
    }

    /// Set the rate limiter policy
    pub fn rate_limiter(mut self, config: RateLimiterConfig) -> Self {
        self.config.resilience.rate_limiter = config;
        self
    }

    /// Add a default header
    pub fn default_header(mut self, name: &str, value: &str) -> Self {
        if let Ok(header_name) = name.parse::<http::header::HeaderName>() {
            if let Ok(header_value) = value.parse::<http::header::HeaderValue>() {
                self.config.default_headers.insert(header_name, header_value);
            }
        }
        self
    }

    /// Build the configuration
    pub fn build(self) -> TelegramResult<TelegramConfig> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Build the configuration without validation (for testing)
    pub fn build_unchecked(self) -> TelegramConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "123456:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw";

    #[test]
    fn test_token_validation() {
        assert_eq!(BotToken::new(TOKEN).unwrap().bot_id(), 123456);
        assert!(BotToken::new("no-colon").is_err());
        assert!(BotToken::new("abc:def").is_err());
        assert!(BotToken::new("123:").is_err());
        assert!(BotToken::new("123:has space").is_err());
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = BotToken::new(TOKEN).unwrap();
        let debug = format!("{:?}", token);
        assert_eq!(debug, "BotToken(123456:[REDACTED])");
    }

    #[test]
    fn test_config_builder() {
        let config = TelegramConfigBuilder::new()
            .token(TOKEN)
            .unwrap()
            .timeout(Duration::from_secs(60))
            .max_retries(5)
            .build()
            .unwrap();

        assert!(config.token.is_some());
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.resilience.retry.max_retries, 5);
    }

    #[test]
    fn test_method_url() {
        let config = TelegramConfigBuilder::new()
            .token(TOKEN)
            .unwrap()
            .base_url("https://api.telegram.org/")
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(
            config.method_url("sendMessage").unwrap(),
            format!("https://api.telegram.org/bot{}/sendMessage", TOKEN)
        );
    }

    #[test]
    fn test_validation_missing_token() {
        let result = TelegramConfigBuilder::new().build();
        assert!(matches!(
            result,
            Err(TelegramError::Configuration(ConfigurationError::MissingToken))
        ));
    }

    #[test]
    fn test_validation_rejects_bad_limits() {
        let result = TelegramConfigBuilder::new()
            .token(TOKEN)
            .unwrap()
            .rate_limiter(RateLimiterConfig::new().max_destinations(0))
            .build();
        assert!(result.is_err());

        let result = TelegramConfigBuilder::new()
            .token(TOKEN)
            .unwrap()
            .max_response_bytes(0)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_hides_token() {
        let config = TelegramConfigBuilder::new().token(TOKEN).unwrap().build_unchecked();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw"));
    }
}
