//! Telegram Bot API Client
//!
//! Bot API client built around a shared outbound dispatch pipeline:
//! - Two-tier rate limiting (global + per chat) with bounded memory
//! - Circuit breaker with injectable failure classification
//! - Retries with exponential backoff, jitter and server retry hints
//! - JSON or streamed multipart encoding, chosen per call
//! - Per-call cancellation and deadlines
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use telegram_client::services::messages::{MessagesServiceTrait, SendMessageRequest};
//! use telegram_client::CallContext;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create client from environment
//!     let client = telegram_client::create_client_from_env()?;
//!
//!     // Send a message
//!     let ctx = CallContext::new().with_timeout(std::time::Duration::from_secs(30));
//!     let message = client
//!         .messages()
//!         .send_message(&ctx, SendMessageRequest::new(123456789, "Hello!"))
//!         .await?;
//!
//!     println!("Message sent: {}", message.message_id);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// Core modules
pub mod client;
pub mod config;
pub mod context;
pub mod encoding;
pub mod errors;
pub mod transport;
pub mod types;

// Services
pub mod services;

// Resilience
pub mod resilience;

// Observability
pub mod observability;

// Testing utilities
pub mod fixtures;
pub mod mocks;

// Tests
#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use client::TelegramClient;
pub use config::{TelegramConfig, TelegramConfigBuilder};
pub use context::CallContext;
pub use encoding::{InputFile, InputMedia, Payload};
pub use errors::{TelegramError, TelegramResult};

/// Default base URL for the Bot API
pub const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// Default per-attempt timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default maximum retries
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Create a client with the given configuration
pub fn create_client(config: TelegramConfig) -> TelegramResult<TelegramClient> {
    TelegramClient::new(config)
}

/// Create a client from environment variables
///
/// Reads:
/// - `TELEGRAM_BOT_TOKEN` - Bot token (`<bot id>:<secret>`)
/// - `TELEGRAM_API_URL` - Base URL, for a local Bot API server
/// - `TELEGRAM_TIMEOUT` - Per-attempt timeout in seconds
/// - `TELEGRAM_MAX_RETRIES` - Retry budget
/// - `TELEGRAM_MAX_RESPONSE_BYTES` - Response size limit
pub fn create_client_from_env() -> TelegramResult<TelegramClient> {
    let config = TelegramConfig::from_env()?;
    create_client(config)
}
