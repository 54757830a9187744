//! Request types for media service.

use crate::encoding::{InputFile, InputMedia, Payload};
use crate::errors::{RequestError, TelegramResult};
use crate::types::{ChatId, ParseMode};
use serde::Serialize;
use serde_json::Value;

/// Smallest number of items in a media group
pub const MEDIA_GROUP_MIN: usize = 2;

/// Largest number of items in a media group
pub const MEDIA_GROUP_MAX: usize = 10;

/// Request to send a photo
#[derive(Debug, Clone, Serialize)]
pub struct SendPhotoRequest {
    /// Target chat
    pub chat_id: ChatId,
    /// Photo to send
    #[serde(skip)]
    pub photo: InputFile,
    /// Caption
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Caption formatting mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    /// Send silently
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_notification: Option<bool>,
    /// Keyboard markup, passed through as JSON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<Value>,
}

impl SendPhotoRequest {
    /// Create a new photo request
    pub fn new(chat_id: impl Into<ChatId>, photo: InputFile) -> Self {
        Self {
            chat_id: chat_id.into(),
            photo,
            caption: None,
            parse_mode: None,
            disable_notification: None,
            reply_markup: None,
        }
    }

    /// Set the caption
    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Set the caption parse mode
    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = Some(mode);
        self
    }

    /// Send without notification
    pub fn silent(mut self) -> Self {
        self.disable_notification = Some(true);
        self
    }

    /// Build the method payload
    pub fn into_payload(self) -> TelegramResult<Payload> {
        Ok(Payload::from_serializable(&self)?.file("photo", self.photo))
    }
}

/// Request to send a general file
#[derive(Debug, Clone, Serialize)]
pub struct SendDocumentRequest {
    /// Target chat
    pub chat_id: ChatId,
    /// File to send
    #[serde(skip)]
    pub document: InputFile,
    /// Thumbnail
    #[serde(skip)]
    pub thumbnail: Option<InputFile>,
    /// Caption
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Caption formatting mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    /// Send silently
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_notification: Option<bool>,
}

impl SendDocumentRequest {
    /// Create a new document request
    pub fn new(chat_id: impl Into<ChatId>, document: InputFile) -> Self {
        Self {
            chat_id: chat_id.into(),
            document,
            thumbnail: None,
            caption: None,
            parse_mode: None,
            disable_notification: None,
        }
    }

    /// Set the caption
    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Set a thumbnail
    pub fn thumbnail(mut self, thumbnail: InputFile) -> Self {
        self.thumbnail = Some(thumbnail);
        self
    }

    /// Build the method payload
    pub fn into_payload(self) -> TelegramResult<Payload> {
        let mut payload = Payload::from_serializable(&self)?.file("document", self.document);
        if let Some(thumbnail) = self.thumbnail {
            payload = payload.file("thumbnail", thumbnail);
        }
        Ok(payload)
    }
}

/// Request to send an album
#[derive(Debug, Clone, Serialize)]
pub struct SendMediaGroupRequest {
    /// Target chat
    pub chat_id: ChatId,
    /// Album items
    #[serde(skip)]
    pub media: Vec<InputMedia>,
    /// Send silently
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_notification: Option<bool>,
}

impl SendMediaGroupRequest {
    /// Create a new media group request
    pub fn new(chat_id: impl Into<ChatId>, media: Vec<InputMedia>) -> Self {
        Self {
            chat_id: chat_id.into(),
            media,
            disable_notification: None,
        }
    }

    /// Send without notification
    pub fn silent(mut self) -> Self {
        self.disable_notification = Some(true);
        self
    }

    /// Build the method payload, checking the album size
    pub fn into_payload(self) -> TelegramResult<Payload> {
        if !(MEDIA_GROUP_MIN..=MEDIA_GROUP_MAX).contains(&self.media.len()) {
            return Err(RequestError::InvalidPayload {
                message: format!(
                    "media group must contain {} to {} items, got {}",
                    MEDIA_GROUP_MIN,
                    MEDIA_GROUP_MAX,
                    self.media.len()
                ),
            }
            .into());
        }
        Ok(Payload::from_serializable(&self)?.media("media", self.media))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::FieldValue;

    #[test]
    fn test_photo_payload() {
        let payload = SendPhotoRequest::new(42, InputFile::memory("a.jpg", "x"))
            .caption("hi")
            .into_payload()
            .unwrap();

        assert!(payload.has_uploads());
        assert!(matches!(payload.get("photo"), Some(FieldValue::File(_))));
        assert!(matches!(payload.get("caption"), Some(FieldValue::Json(v)) if v == "hi"));
        assert_eq!(payload.destination().as_deref(), Some("42"));
    }

    #[test]
    fn test_photo_by_file_id_stays_json() {
        let payload = SendPhotoRequest::new(42, InputFile::file_id("AgAD"))
            .into_payload()
            .unwrap();
        assert!(!payload.has_uploads());
    }

    #[test]
    fn test_media_group_size_checked() {
        let one = vec![InputMedia::photo(InputFile::file_id("a"))];
        assert!(SendMediaGroupRequest::new(1, one).into_payload().is_err());

        let eleven = (0..11)
            .map(|i| InputMedia::photo(InputFile::file_id(format!("id{}", i))))
            .collect();
        assert!(SendMediaGroupRequest::new(1, eleven).into_payload().is_err());
    }
}
