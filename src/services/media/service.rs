//! Media service implementation.

use super::*;
use crate::client::Dispatcher;
use crate::context::CallContext;
use crate::errors::TelegramResult;
use crate::types::Message;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

/// Trait for media service operations
#[async_trait]
pub trait MediaServiceTrait: Send + Sync {
    /// Send a photo
    async fn send_photo(&self, ctx: &CallContext, request: SendPhotoRequest) -> TelegramResult<Message>;

    /// Send a general file
    async fn send_document(
        &self,
        ctx: &CallContext,
        request: SendDocumentRequest,
    ) -> TelegramResult<Message>;

    /// Send an album of photos, videos, documents or audio files
    async fn send_media_group(
        &self,
        ctx: &CallContext,
        request: SendMediaGroupRequest,
    ) -> TelegramResult<Vec<Message>>;
}

/// Media service implementation
#[derive(Debug, Clone)]
pub struct MediaService {
    dispatcher: Arc<Dispatcher>,
}

impl MediaService {
    /// Create a new media service
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl MediaServiceTrait for MediaService {
    #[instrument(skip(self, ctx, request), fields(chat_id = %request.chat_id))]
    async fn send_photo(&self, ctx: &CallContext, request: SendPhotoRequest) -> TelegramResult<Message> {
        let payload = request.into_payload()?;
        self.dispatcher.call(ctx, "sendPhoto", payload).await
    }

    #[instrument(skip(self, ctx, request), fields(chat_id = %request.chat_id))]
    async fn send_document(
        &self,
        ctx: &CallContext,
        request: SendDocumentRequest,
    ) -> TelegramResult<Message> {
        let payload = request.into_payload()?;
        self.dispatcher.call(ctx, "sendDocument", payload).await
    }

    #[instrument(skip(self, ctx, request), fields(chat_id = %request.chat_id, items = request.media.len()))]
    async fn send_media_group(
        &self,
        ctx: &CallContext,
        request: SendMediaGroupRequest,
    ) -> TelegramResult<Vec<Message>> {
        let payload = request.into_payload()?;
        self.dispatcher.call(ctx, "sendMediaGroup", payload).await
    }
}
