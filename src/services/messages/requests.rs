//! Request types for messages service.

use crate::types::{ChatAction, ChatId, ParseMode};
use serde::Serialize;
use serde_json::Value;

/// Request to send a text message
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest {
    /// Target chat
    pub chat_id: ChatId,
    /// Message text
    pub text: String,
    /// Formatting mode for entities in the text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    /// Forum topic to send into
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_thread_id: Option<i64>,
    /// Send silently
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_notification: Option<bool>,
    /// Protect the message from forwarding and saving
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protect_content: Option<bool>,
    /// Message to reply to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<i64>,
    /// Keyboard markup, passed through as JSON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<Value>,
}

impl SendMessageRequest {
    /// Create a new message request
    pub fn new(chat_id: impl Into<ChatId>, text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            text: text.into(),
            parse_mode: None,
            message_thread_id: None,
            disable_notification: None,
            protect_content: None,
            reply_to_message_id: None,
            reply_markup: None,
        }
    }

    /// Set the parse mode
    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = Some(mode);
        self
    }

    /// Send into a forum topic
    pub fn thread(mut self, thread_id: i64) -> Self {
        self.message_thread_id = Some(thread_id);
        self
    }

    /// Send without notification
    pub fn silent(mut self) -> Self {
        self.disable_notification = Some(true);
        self
    }

    /// Reply to a message
    pub fn reply_to(mut self, message_id: i64) -> Self {
        self.reply_to_message_id = Some(message_id);
        self
    }

    /// Attach reply markup
    pub fn reply_markup(mut self, markup: Value) -> Self {
        self.reply_markup = Some(markup);
        self
    }
}

/// Request to edit the text of a message
#[derive(Debug, Clone, Serialize)]
pub struct EditMessageTextRequest {
    /// Chat of the message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<ChatId>,
    /// Message to edit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,
    /// Inline message to edit, instead of `chat_id` + `message_id`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_message_id: Option<String>,
    /// New text
    pub text: String,
    /// Formatting mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    /// New inline keyboard
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<Value>,
}

impl EditMessageTextRequest {
    /// Edit a message in a chat
    pub fn new(chat_id: impl Into<ChatId>, message_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id: Some(chat_id.into()),
            message_id: Some(message_id),
            inline_message_id: None,
            text: text.into(),
            parse_mode: None,
            reply_markup: None,
        }
    }

    /// Edit an inline message
    pub fn inline(inline_message_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            chat_id: None,
            message_id: None,
            inline_message_id: Some(inline_message_id.into()),
            text: text.into(),
            parse_mode: None,
            reply_markup: None,
        }
    }

    /// Set the parse mode
    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = Some(mode);
        self
    }

    /// Replace the inline keyboard
    pub fn reply_markup(mut self, markup: Value) -> Self {
        self.reply_markup = Some(markup);
        self
    }
}

/// Request to forward a message
#[derive(Debug, Clone, Serialize)]
pub struct ForwardMessageRequest {
    /// Target chat
    pub chat_id: ChatId,
    /// Chat the original message is in
    pub from_chat_id: ChatId,
    /// Message to forward
    pub message_id: i64,
    /// Send silently
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_notification: Option<bool>,
}

impl ForwardMessageRequest {
    /// Create a new forward request
    pub fn new(chat_id: impl Into<ChatId>, from_chat_id: impl Into<ChatId>, message_id: i64) -> Self {
        Self {
            chat_id: chat_id.into(),
            from_chat_id: from_chat_id.into(),
            message_id,
            disable_notification: None,
        }
    }

    /// Forward without notification
    pub fn silent(mut self) -> Self {
        self.disable_notification = Some(true);
        self
    }
}

/// Request to delete a message
#[derive(Debug, Clone, Serialize)]
pub struct DeleteMessageRequest {
    /// Chat of the message
    pub chat_id: ChatId,
    /// Message to delete
    pub message_id: i64,
}

impl DeleteMessageRequest {
    /// Create a new delete request
    pub fn new(chat_id: impl Into<ChatId>, message_id: i64) -> Self {
        Self {
            chat_id: chat_id.into(),
            message_id,
        }
    }
}

/// Request to broadcast a chat action
#[derive(Debug, Clone, Serialize)]
pub struct SendChatActionRequest {
    /// Target chat
    pub chat_id: ChatId,
    /// Action to show
    pub action: ChatAction,
}

impl SendChatActionRequest {
    /// Create a new chat action request
    pub fn new(chat_id: impl Into<ChatId>, action: ChatAction) -> Self {
        Self {
            chat_id: chat_id.into(),
            action,
        }
    }
}
