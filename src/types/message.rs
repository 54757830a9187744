//! Message types.

use super::{Chat, User};
use serde::{Deserialize, Serialize};

/// Identifier of a sent message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageId {
    /// Message identifier inside its chat
    pub message_id: i64,
}

/// One size of a photo or thumbnail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoSize {
    /// Identifier for downloading or reusing the file
    pub file_id: String,
    /// Identifier stable across bots
    pub file_unique_id: String,
    /// Width
    pub width: u32,
    /// Height
    pub height: u32,
    /// File size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

/// A general file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier for downloading or reusing the file
    pub file_id: String,
    /// Identifier stable across bots
    pub file_unique_id: String,
    /// Original file name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// MIME type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// File size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

/// A message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Identifier inside the chat
    pub message_id: i64,
    /// Sender, empty for channel posts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    /// Unix time the message was sent
    pub date: i64,
    /// Chat the message belongs to
    pub chat: Chat,
    /// Unix time of the last edit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_date: Option<i64>,
    /// Identifier of the media group this message belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_group_id: Option<String>,
    /// Text of a text message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Caption of a media message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Available sizes of a photo
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<Vec<PhotoSize>>,
    /// Attached document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
}

/// Result of edit methods: the edited message, or `true` for inline messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EditResult {
    /// The edited message
    Message(Box<Message>),
    /// Inline message edited
    Inline(bool),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatType;

    #[test]
    fn test_message_deserialize() {
        let json = r#"{
            "message_id": 7,
            "from": {"id": 1, "is_bot": true, "first_name": "Bot"},
            "date": 1700000000,
            "chat": {"id": -1001, "type": "supergroup", "title": "Team"},
            "text": "hello"
        }"#;

        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.message_id, 7);
        assert_eq!(message.chat.kind, ChatType::Supergroup);
        assert!(!message.chat.is_private());
        assert_eq!(message.text.as_deref(), Some("hello"));
    }

    #[test]
    fn test_edit_result_inline() {
        let result: EditResult = serde_json::from_str("true").unwrap();
        assert_eq!(result, EditResult::Inline(true));
    }
}
