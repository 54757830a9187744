//! Messages service implementation.

use super::*;
use crate::client::Dispatcher;
use crate::context::CallContext;
use crate::encoding::Payload;
use crate::errors::TelegramResult;
use crate::types::{EditResult, Message, MessageId};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

/// Trait for messages service operations
#[async_trait]
pub trait MessagesServiceTrait: Send + Sync {
    /// Send a text message
    async fn send_message(&self, ctx: &CallContext, request: SendMessageRequest) -> TelegramResult<Message>;

    /// Edit the text of a message
    async fn edit_message_text(
        &self,
        ctx: &CallContext,
        request: EditMessageTextRequest,
    ) -> TelegramResult<EditResult>;

    /// Forward a message
    async fn forward_message(
        &self,
        ctx: &CallContext,
        request: ForwardMessageRequest,
    ) -> TelegramResult<Message>;

    /// Copy a message without a link to the original
    async fn copy_message(
        &self,
        ctx: &CallContext,
        request: ForwardMessageRequest,
    ) -> TelegramResult<MessageId>;

    /// Delete a message
    async fn delete_message(&self, ctx: &CallContext, request: DeleteMessageRequest) -> TelegramResult<bool>;

    /// Show a chat action such as "typing"
    async fn send_chat_action(
        &self,
        ctx: &CallContext,
        request: SendChatActionRequest,
    ) -> TelegramResult<bool>;
}

/// Messages service implementation
#[derive(Debug, Clone)]
pub struct MessagesService {
    dispatcher: Arc<Dispatcher>,
}

impl MessagesService {
    /// Create a new messages service
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl MessagesServiceTrait for MessagesService {
    #[instrument(skip(self, ctx, request), fields(chat_id = %request.chat_id))]
    async fn send_message(&self, ctx: &CallContext, request: SendMessageRequest) -> TelegramResult<Message> {
        let payload = Payload::from_serializable(&request)?;
        self.dispatcher.call(ctx, "sendMessage", payload).await
    }

    #[instrument(skip(self, ctx, request))]
    async fn edit_message_text(
        &self,
        ctx: &CallContext,
        request: EditMessageTextRequest,
    ) -> TelegramResult<EditResult> {
        let payload = Payload::from_serializable(&request)?;
        self.dispatcher.call(ctx, "editMessageText", payload).await
    }

    #[instrument(skip(self, ctx, request), fields(chat_id = %request.chat_id, from = %request.from_chat_id))]
    async fn forward_message(
        &self,
        ctx: &CallContext,
        request: ForwardMessageRequest,
    ) -> TelegramResult<Message> {
        let payload = Payload::from_serializable(&request)?;
        self.dispatcher.call(ctx, "forwardMessage", payload).await
    }

    #[instrument(skip(self, ctx, request), fields(chat_id = %request.chat_id, from = %request.from_chat_id))]
    async fn copy_message(
        &self,
        ctx: &CallContext,
        request: ForwardMessageRequest,
    ) -> TelegramResult<MessageId> {
        let payload = Payload::from_serializable(&request)?;
        self.dispatcher.call(ctx, "copyMessage", payload).await
    }

    #[instrument(skip(self, ctx, request), fields(chat_id = %request.chat_id, message_id = request.message_id))]
    async fn delete_message(&self, ctx: &CallContext, request: DeleteMessageRequest) -> TelegramResult<bool> {
        let payload = Payload::from_serializable(&request)?;
        self.dispatcher.call(ctx, "deleteMessage", payload).await
    }

    #[instrument(skip(self, ctx, request), fields(chat_id = %request.chat_id, action = request.action.as_str()))]
    async fn send_chat_action(
        &self,
        ctx: &CallContext,
        request: SendChatActionRequest,
    ) -> TelegramResult<bool> {
        let payload = Payload::from_serializable(&request)?;
        self.dispatcher.call(ctx, "sendChatAction", payload).await
    }
}
