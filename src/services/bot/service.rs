//! Bot service implementation.

use crate::client::Dispatcher;
use crate::context::CallContext;
use crate::encoding::Payload;
use crate::errors::TelegramResult;
use crate::types::User;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

/// Trait for bot service operations
#[async_trait]
pub trait BotServiceTrait: Send + Sync {
    /// Get the bot's own user record; useful for checking the token
    async fn get_me(&self, ctx: &CallContext) -> TelegramResult<User>;

    /// Log the bot out of the cloud Bot API server
    async fn log_out(&self, ctx: &CallContext) -> TelegramResult<bool>;
}

/// Bot service implementation
#[derive(Debug, Clone)]
pub struct BotService {
    dispatcher: Arc<Dispatcher>,
}

impl BotService {
    /// Create a new bot service
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl BotServiceTrait for BotService {
    #[instrument(skip(self, ctx))]
    async fn get_me(&self, ctx: &CallContext) -> TelegramResult<User> {
        self.dispatcher.call(ctx, "getMe", Payload::new()).await
    }

    #[instrument(skip(self, ctx))]
    async fn log_out(&self, ctx: &CallContext) -> TelegramResult<bool> {
        self.dispatcher.call(ctx, "logOut", Payload::new()).await
    }
}
