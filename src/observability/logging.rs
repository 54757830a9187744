//! Logging utilities with sensitive data redaction.
//!
//! The bot token is part of every request path (`/bot<token>/<method>`), so
//! URLs must pass through [`redact_url`] before they reach a log line.

use std::fmt;

/// Wrapper for sensitive data that redacts on display
#[derive(Clone)]
pub struct Redacted<T>(T);

impl<T> Redacted<T> {
    /// Create a new redacted value
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Get the inner value (use sparingly)
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T> fmt::Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T> fmt::Display for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

/// Redact a bot token, keeping the numeric bot id for debugging
pub fn redact_token(token: &str) -> String {
    match token.split_once(':') {
        Some((bot_id, _)) if !bot_id.is_empty() && bot_id.bytes().all(|b| b.is_ascii_digit()) => {
            format!("{}:[REDACTED]", bot_id)
        }
        _ => "[REDACTED]".to_string(),
    }
}

/// Redact the token segment of a `.../bot<token>/...` URL
pub fn redact_url(url: &str) -> String {
    let Some(start) = url.find("/bot") else {
        return url.to_string();
    };
    let token_start = start + "/bot".len();
    let rest = &url[token_start..];
    let token_end = rest.find(['/', '?']).unwrap_or(rest.len());

    format!(
        "{}{}{}",
        &url[..token_start],
        redact_token(&rest[..token_end]),
        &rest[token_end..]
    )
}
