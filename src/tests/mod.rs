//! Tests for the Bot API client.


#[cfg(test)]
mod resilience_tests;
