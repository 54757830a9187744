//! Per-call cancellation and deadline signal.
//!
//! Every operation that can suspend (rate-limit admission, backoff sleep,
//! the HTTP exchange) takes a [`CallContext`] and aborts as soon as it fires.

use crate::errors::{TelegramError, TelegramResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation token plus optional deadline for one logical call
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context that never fires on its own
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing cancellation token
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Fire after `timeout` from now
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Fire at `deadline`
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// The underlying cancellation token
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancel the call
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The configured deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Error describing why the context has fired, if it has
    pub fn check(&self) -> TelegramResult<()> {
        if self.token.is_cancelled() {
            return Err(TelegramError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(TelegramError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Resolve once the context fires, yielding the matching error
    pub async fn done(&self) -> TelegramError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.token.cancelled() => TelegramError::Cancelled,
                _ = tokio::time::sleep_until(deadline) => TelegramError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                TelegramError::Cancelled
            }
        }
    }

    /// Sleep for `duration` unless the context fires first
    pub async fn sleep(&self, duration: Duration) -> TelegramResult<()> {
        self.run(async {
            tokio::time::sleep(duration).await;
            Ok(())
        })
        .await
    }

    /// Drive `fut` to completion unless the context fires first
    pub async fn run<F, T>(&self, fut: F) -> TelegramResult<T>
    where
        F: Future<Output = TelegramResult<T>>,
    {
        self.check()?;
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            result = fut => result,
        }
    }
}
