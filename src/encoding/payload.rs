//! Method parameters as an ordered list of named fields.

use super::input_file::InputFile;
use crate::errors::{RequestError, TelegramResult};
use serde::Serialize;
use serde_json::{Map, Value};

/// Kind of an element in a media group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Photo
    Photo,
    /// Video
    Video,
    /// Animation (GIF or soundless video)
    Animation,
    /// Audio
    Audio,
    /// General document
    Document,
}

impl MediaKind {
    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Animation => "animation",
            Self::Audio => "audio",
            Self::Document => "document",
        }
    }
}

/// One element of a media group
#[derive(Debug, Clone)]
pub struct InputMedia {
    /// Media kind
    pub kind: MediaKind,
    /// The media file
    pub media: InputFile,
    /// Optional thumbnail
    pub thumbnail: Option<InputFile>,
    /// Extra fields (caption, parse_mode, ...)
    pub fields: Map<String, Value>,
}

impl InputMedia {
    /// Create a media element
    pub fn new(kind: MediaKind, media: InputFile) -> Self {
        Self {
            kind,
            media,
            thumbnail: None,
            fields: Map::new(),
        }
    }

    /// A photo element
    pub fn photo(media: InputFile) -> Self {
        Self::new(MediaKind::Photo, media)
    }

    /// A video element
    pub fn video(media: InputFile) -> Self {
        Self::new(MediaKind::Video, media)
    }

    /// A document element
    pub fn document(media: InputFile) -> Self {
        Self::new(MediaKind::Document, media)
    }

    /// An audio element
    pub fn audio(media: InputFile) -> Self {
        Self::new(MediaKind::Audio, media)
    }

    /// Set the caption
    pub fn caption(self, caption: impl Into<String>) -> Self {
        self.field("caption", caption.into())
    }

    /// Set the caption parse mode
    pub fn parse_mode(self, mode: impl Into<String>) -> Self {
        self.field("parse_mode", mode.into())
    }

    /// Set a thumbnail
    pub fn thumbnail(mut self, thumbnail: InputFile) -> Self {
        self.thumbnail = Some(thumbnail);
        self
    }

    /// Set an arbitrary extra field
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    fn has_upload(&self) -> bool {
        self.media.is_upload() || self.thumbnail.as_ref().is_some_and(InputFile::is_upload)
    }
}

/// Value of one payload field
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// Any JSON value
    Json(Value),
    /// A single file
    File(InputFile),
    /// A list of media elements that may reference uploads
    Media(Vec<InputMedia>),
}

/// Parameters of one API method call
#[derive(Debug, Clone, Default)]
pub struct Payload {
    fields: Vec<(String, FieldValue)>,
}

impl Payload {
    /// Create an empty payload
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&mut self, name: String, value: FieldValue) {
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Build a payload from a struct serializing to a JSON object
    pub fn from_serializable<T: Serialize + ?Sized>(value: &T) -> TelegramResult<Self> {
        match serde_json::to_value(value).map_err(RequestError::from)? {
            Value::Object(map) => Ok(map
                .into_iter()
                .fold(Self::new(), |payload, (name, value)| payload.field(name, value))),
            other => Err(RequestError::InvalidPayload {
                message: format!("expected a JSON object, got {}", other),
            }
            .into()),
        }
    }

    /// Set a JSON field
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name.into(), FieldValue::Json(value.into()));
        self
    }

    /// Set a JSON field when `value` is present
    pub fn optional<V: Into<Value>>(self, name: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.field(name, value),
            None => self,
        }
    }

    /// Set a field from any serializable value
    pub fn serialized<T: Serialize + ?Sized>(
        mut self,
        name: impl Into<String>,
        value: &T,
    ) -> TelegramResult<Self> {
        let value = serde_json::to_value(value).map_err(RequestError::from)?;
        self.set(name.into(), FieldValue::Json(value));
        Ok(self)
    }

    /// Set a file field
    pub fn file(mut self, name: impl Into<String>, file: InputFile) -> Self {
        self.set(name.into(), FieldValue::File(file));
        self
    }

    /// Set a media list field
    pub fn media(mut self, name: impl Into<String>, media: Vec<InputMedia>) -> Self {
        self.set(name.into(), FieldValue::Media(media));
        self
    }

    /// Look up a field
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Iterate over fields in insertion order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the payload has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether any field carries file content
    pub fn has_uploads(&self) -> bool {
        self.fields.iter().any(|(_, value)| match value {
            FieldValue::Json(_) => false,
            FieldValue::File(file) => file.is_upload(),
            FieldValue::Media(media) => media.iter().any(InputMedia::has_upload),
        })
    }

    /// Rate-limit destination derived from the `chat_id` field
    pub fn destination(&self) -> Option<String> {
        match self.get("chat_id")? {
            FieldValue::Json(Value::Number(n)) => Some(n.to_string()),
            FieldValue::Json(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}
