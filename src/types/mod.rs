//! Shared types for the Bot API.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod chat;
pub mod message;

pub use chat::*;
pub use message::*;

/// Target chat: a numeric id or an `@username` handle
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatId {
    /// Numeric chat id (negative for groups and channels)
    Id(i64),
    /// Public handle such as `@channel`
    Username(String),
}

impl ChatId {
    /// Whether the chat has more than two participants
    ///
    /// Negative ids are groups, supergroups and channels; `@username`
    /// targets are public channels or supergroups.
    pub fn is_multi_party(&self) -> bool {
        match self {
            Self::Id(id) => *id < 0,
            Self::Username(_) => true,
        }
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{}", id),
            Self::Username(name) => f.write_str(name),
        }
    }
}

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for ChatId {
    fn from(s: &str) -> Self {
        match s.parse::<i64>() {
            Ok(id) => Self::Id(id),
            Err(_) => Self::Username(s.to_string()),
        }
    }
}

impl From<String> for ChatId {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<ChatId> for serde_json::Value {
    fn from(id: ChatId) -> Self {
        match id {
            ChatId::Id(id) => id.into(),
            ChatId::Username(name) => name.into(),
        }
    }
}

/// Structured hints attached to a failed response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseParameters {
    /// Seconds to wait before repeating the request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    /// The group was migrated to a supergroup with this id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrate_to_chat_id: Option<i64>,
}

/// Text formatting mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    /// MarkdownV2 entities
    MarkdownV2,
    /// HTML entities
    #[serde(rename = "HTML")]
    Html,
    /// Legacy Markdown
    Markdown,
}

impl ParseMode {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarkdownV2 => "MarkdownV2",
            Self::Html => "HTML",
            Self::Markdown => "Markdown",
        }
    }
}

/// Chat action broadcast by `sendChatAction`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatAction {
    /// Typing text
    Typing,
    /// Uploading a photo
    UploadPhoto,
    /// Recording a video
    RecordVideo,
    /// Uploading a video
    UploadVideo,
    /// Recording a voice note
    RecordVoice,
    /// Uploading a voice note
    UploadVoice,
    /// Uploading a document
    UploadDocument,
    /// Choosing a sticker
    ChooseSticker,
    /// Finding a location
    FindLocation,
}

impl ChatAction {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Typing => "typing",
            Self::UploadPhoto => "upload_photo",
            Self::RecordVideo => "record_video",
            Self::UploadVideo => "upload_video",
            Self::RecordVoice => "record_voice",
            Self::UploadVoice => "upload_voice",
            Self::UploadDocument => "upload_document",
            Self::ChooseSticker => "choose_sticker",
            Self::FindLocation => "find_location",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_id_from_str() {
        assert_eq!(ChatId::from("12345"), ChatId::Id(12345));
        assert_eq!(ChatId::from("-100200"), ChatId::Id(-100200));
        assert_eq!(ChatId::from("@news"), ChatId::Username("@news".into()));
    }

    #[test]
    fn test_chat_id_multi_party() {
        assert!(!ChatId::Id(42).is_multi_party());
        assert!(ChatId::Id(-42).is_multi_party());
        assert!(ChatId::from("@news").is_multi_party());
    }

    #[test]
    fn test_chat_id_serde() {
        assert_eq!(serde_json::to_string(&ChatId::Id(-1)).unwrap(), "-1");
        assert_eq!(
            serde_json::from_str::<ChatId>("\"@c\"").unwrap(),
            ChatId::Username("@c".into())
        );
    }

    #[test]
    fn test_chat_action_wire_name() {
        assert_eq!(
            serde_json::to_string(&ChatAction::UploadDocument).unwrap(),
            "\"upload_document\""
        );
        assert_eq!(ChatAction::UploadDocument.as_str(), "upload_document");
    }
}
