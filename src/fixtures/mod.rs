//! Test fixtures for Bot API responses.
//!
//! Provides realistic test data for unit and integration tests.

use crate::config::{BotToken, TelegramConfig, TelegramConfigBuilder};
use crate::resilience::{CircuitBreakerConfig, RateLimiterConfig, RetryConfig};
use crate::types::*;
use std::time::Duration;

/// A syntactically valid bot token
pub const BOT_TOKEN: &str = "123456789:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw";

/// The bot's own user record, as returned by `getMe`
pub fn bot_user() -> User {
    User {
        id: 123456789,
        is_bot: true,
        first_name: "Dispatch".to_string(),
        last_name: None,
        username: Some("dispatch_bot".to_string()),
        language_code: None,
        can_join_groups: Some(true),
        can_read_all_group_messages: Some(false),
    }
}

/// A private chat
pub fn private_chat(id: i64) -> Chat {
    Chat {
        id,
        kind: ChatType::Private,
        title: None,
        username: Some("alice".to_string()),
        first_name: Some("Alice".to_string()),
        last_name: None,
    }
}

/// A supergroup
pub fn supergroup(id: i64) -> Chat {
    Chat {
        id,
        kind: ChatType::Supergroup,
        title: Some("Operations".to_string()),
        username: None,
        first_name: None,
        last_name: None,
    }
}

/// A text message sent by the bot
pub fn text_message(chat_id: i64, message_id: i64, text: &str) -> Message {
    let chat = if chat_id < 0 {
        supergroup(chat_id)
    } else {
        private_chat(chat_id)
    };
    Message {
        message_id,
        from: Some(bot_user()),
        date: 1_700_000_000,
        chat,
        edit_date: None,
        media_group_id: None,
        text: Some(text.to_string()),
        caption: None,
        photo: None,
        document: None,
    }
}

/// A photo message sent by the bot
pub fn photo_message(chat_id: i64, message_id: i64) -> Message {
    Message {
        text: None,
        photo: Some(vec![PhotoSize {
            file_id: "AgACAgIAAxkBAAIBY2".to_string(),
            file_unique_id: "AQADY2".to_string(),
            width: 320,
            height: 240,
            file_size: Some(12_345),
        }]),
        ..text_message(chat_id, message_id, "")
    }
}

/// Configuration with fast retries and a permissive limiter, pointed at `base_url`
pub fn test_config(base_url: &str) -> TelegramConfig {
    let mut config = TelegramConfigBuilder::new()
        .timeout(Duration::from_secs(5))
        .retry(
            RetryConfig::new()
                .max_retries(3)
                .initial_delay(Duration::from_millis(10))
                .max_delay(Duration::from_millis(100))
                .jitter_fraction(0.0),
        )
        .circuit_breaker(CircuitBreakerConfig::new().min_requests(100))
        .rate_limiter(
            RateLimiterConfig::new()
                .global(1_000.0, 1_000)
                .chat(1_000.0, 1_000)
                .group(1_000.0, 1_000),
        )
        .build_unchecked();
    config.token = BotToken::new(BOT_TOKEN).ok();
    config.base_url = base_url.to_string();
    config
}
