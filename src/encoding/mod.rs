//! Request body encoding.
//!
//! A payload without file content is sent as one JSON document. As soon as
//! any field carries file content the whole payload switches to a streamed
//! `multipart/form-data` body.

pub mod input_file;
pub mod multipart;
pub mod payload;

pub use input_file::{InputFile, ReaderFactory, UploadReader};
pub use multipart::{BodyStream, UploadError};
pub use payload::{FieldValue, InputMedia, MediaKind, Payload};

use crate::errors::{RequestError, TelegramResult};
use bytes::Bytes;
use futures::StreamExt;
use multipart::{Multipart, Part};
use serde_json::{Map, Value};
use std::fmt;

/// Encoded request body
pub enum RequestBody {
    /// A complete in-memory body
    Bytes(Bytes),
    /// A body produced incrementally by a background task
    Stream(BodyStream),
}

impl RequestBody {
    /// Read the whole body into memory
    ///
    /// Fails if an upload source failed while the body was produced.
    pub async fn collect(self) -> Result<Bytes, UploadError> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            Self::Stream(mut stream) => {
                let mut out = Vec::new();
                while let Some(chunk) = stream.next().await {
                    out.extend_from_slice(&chunk?);
                }
                Ok(Bytes::from(out))
            }
        }
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// A ready-to-send body and its content type
#[derive(Debug)]
pub struct EncodedBody {
    /// Value for the `Content-Type` header
    pub content_type: String,
    /// Body
    pub body: RequestBody,
}

impl EncodedBody {
    /// Whether the body is multipart
    pub fn is_multipart(&self) -> bool {
        self.content_type.starts_with("multipart/")
    }
}

/// Encode `payload` for one attempt
///
/// Multipart bodies are produced by a task spawned on the current tokio
/// runtime. Each call lays out the body afresh: factories are reopened and
/// single-use readers are consumed by the first call only.
pub fn encode(payload: &Payload) -> TelegramResult<EncodedBody> {
    if !payload.has_uploads() {
        return encode_json(payload);
    }

    let handle = tokio::runtime::Handle::try_current().map_err(|e| RequestError::InvalidPayload {
        message: format!("multipart encoding requires a tokio runtime: {}", e),
    })?;

    let mut form = Multipart::new();
    let mut attachments = 0usize;

    for (name, value) in payload.fields() {
        match value {
            FieldValue::Json(value) => form.push(Part::text(name, text_value(value)?)),
            FieldValue::File(file) => match file.reference() {
                Some(reference) => form.push(Part::text(name, reference)),
                None => form.push(Part::file(name, file)),
            },
            FieldValue::Media(media) => {
                let mut items = Vec::with_capacity(media.len());
                for item in media {
                    items.push(media_json(item, |file| {
                        let token = format!("file{}", attachments);
                        attachments += 1;
                        form.push(Part::file(token.clone(), file));
                        format!("attach://{}", token)
                    }));
                }
                let encoded = serde_json::to_string(&items).map_err(RequestError::from)?;
                form.push(Part::text(name, encoded));
            }
        }
    }

    let content_type = form.content_type();
    Ok(EncodedBody {
        content_type,
        body: RequestBody::Stream(form.stream(&handle)),
    })
}

fn encode_json(payload: &Payload) -> TelegramResult<EncodedBody> {
    let mut document = Map::with_capacity(payload.len());
    for (name, value) in payload.fields() {
        let value = match value {
            FieldValue::Json(value) => value.clone(),
            FieldValue::File(file) => Value::String(file.reference().unwrap_or_default().to_string()),
            FieldValue::Media(media) => Value::Array(
                media
                    .iter()
                    .map(|item| media_json(item, |_| String::new()))
                    .collect(),
            ),
        };
        document.insert(name.to_string(), value);
    }
    let body = serde_json::to_vec(&document).map_err(RequestError::from)?;
    Ok(EncodedBody {
        content_type: mime::APPLICATION_JSON.to_string(),
        body: RequestBody::Bytes(Bytes::from(body)),
    })
}

/// Form field text for a JSON value: strings verbatim, scalars printed,
/// structured values as embedded JSON
fn text_value(value: &Value) -> TelegramResult<String> {
    Ok(match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string(value).map_err(RequestError::from)?
        }
    })
}

/// JSON object for one media element; `attach` names an upload and returns
/// the reference to embed
fn media_json(item: &InputMedia, mut attach: impl FnMut(&InputFile) -> String) -> Value {
    let mut object = Map::new();
    object.insert("type".into(), Value::String(item.kind.as_str().into()));
    object.insert("media".into(), Value::String(file_ref(&item.media, &mut attach)));
    if let Some(thumbnail) = &item.thumbnail {
        object.insert("thumbnail".into(), Value::String(file_ref(thumbnail, &mut attach)));
    }
    for (key, value) in &item.fields {
        object.insert(key.clone(), value.clone());
    }
    Value::Object(object)
}

fn file_ref(file: &InputFile, attach: &mut impl FnMut(&InputFile) -> String) -> String {
    match file.reference() {
        Some(reference) => reference.to_string(),
        None => attach(file),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    async fn body_text(encoded: EncodedBody) -> String {
        let bytes = encoded.body.collect().await.unwrap();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    fn field_value<'a>(body: &'a str, name: &str) -> Option<&'a str> {
        let marker = format!("name=\"{}\"\r\n\r\n", name);
        let start = body.find(&marker)? + marker.len();
        let end = body[start..].find("\r\n")?;
        Some(&body[start..start + end])
    }

    #[tokio::test]
    async fn test_json_without_uploads() {
        let payload = Payload::new()
            .field("chat_id", 42)
            .field("text", "hello")
            .file("photo", InputFile::file_id("AgAD"));

        let encoded = encode(&payload).unwrap();
        assert_eq!(encoded.content_type, "application/json");
        assert!(!encoded.is_multipart());

        let json: Value = serde_json::from_str(&body_text(encoded).await).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"chat_id": 42, "text": "hello", "photo": "AgAD"})
        );
    }

    #[tokio::test]
    async fn test_single_file_part_named_after_field() {
        let payload = Payload::new()
            .field("chat_id", 42)
            .field("caption", "a cat")
            .file("photo", InputFile::memory("cat.jpg", vec![0xFFu8, 0xD8, 0xFF]));

        let encoded = encode(&payload).unwrap();
        assert!(encoded
            .content_type
            .starts_with("multipart/form-data; boundary="));

        let body = body_text(encoded).await;
        assert_eq!(body.matches("filename=").count(), 1);
        assert!(body.contains("name=\"photo\"; filename=\"cat.jpg\"\r\nContent-Type: image/jpeg"));
        assert_eq!(field_value(&body, "chat_id"), Some("42"));
        assert_eq!(field_value(&body, "caption"), Some("a cat"));
    }

    #[tokio::test]
    async fn test_structured_fields_are_embedded_json() {
        let payload = Payload::new()
            .field("chat_id", 1)
            .field("reply_markup", serde_json::json!({"remove_keyboard": true}))
            .file("document", InputFile::memory("a.txt", "x"));

        let body = body_text(encode(&payload).unwrap()).await;
        assert_eq!(
            field_value(&body, "reply_markup"),
            Some("{\"remove_keyboard\":true}")
        );
    }

    #[tokio::test]
    async fn test_media_group_attachments() {
        let payload = Payload::new().field("chat_id", -100).media(
            "media",
            vec![
                InputMedia::photo(InputFile::memory("a.jpg", "AAAA")).caption("first"),
                InputMedia::photo(InputFile::memory("b.jpg", "BBBB")),
            ],
        );

        let body = body_text(encode(&payload).unwrap()).await;

        assert!(body.contains("name=\"file0\"; filename=\"a.jpg\""));
        assert!(body.contains("name=\"file1\"; filename=\"b.jpg\""));
        assert!(!body.contains("name=\"media\"; filename"));

        let media: Value = serde_json::from_str(field_value(&body, "media").unwrap()).unwrap();
        assert_eq!(
            media,
            serde_json::json!([
                {"type": "photo", "media": "attach://file0", "caption": "first"},
                {"type": "photo", "media": "attach://file1"}
            ])
        );
    }

    #[tokio::test]
    async fn test_media_group_mixes_references() {
        let payload = Payload::new().media(
            "media",
            vec![
                InputMedia::video(InputFile::file_id("BAAC"))
                    .thumbnail(InputFile::memory("t.jpg", "T")),
                InputMedia::photo(InputFile::memory("p.jpg", "P")),
            ],
        );

        let body = body_text(encode(&payload).unwrap()).await;
        let media: Value = serde_json::from_str(field_value(&body, "media").unwrap()).unwrap();
        assert_eq!(media[0]["media"], "BAAC");
        assert_eq!(media[0]["thumbnail"], "attach://file0");
        assert_eq!(media[1]["media"], "attach://file1");
    }

    #[tokio::test]
    async fn test_factory_reopened_every_attempt() {
        let opened = Arc::new(AtomicU32::new(0));
        let counter = opened.clone();
        let payload = Payload::new().file(
            "document",
            InputFile::factory("report.csv", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(std::io::Cursor::new(b"a,b\n1,2\n".to_vec())) }
            }),
        );

        for _ in 0..2 {
            let body = body_text(encode(&payload).unwrap()).await;
            assert!(body.contains("\r\n\r\na,b\n1,2\n\r\n--"));
        }
        assert_eq!(opened.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_single_use_reader_is_empty_on_retry() {
        let payload =
            Payload::new().file("document", InputFile::reader("a.txt", &b"payload"[..]));

        let first = body_text(encode(&payload).unwrap()).await;
        assert!(first.contains("Content-Type: text/plain\r\n\r\npayload\r\n"));

        let second = body_text(encode(&payload).unwrap()).await;
        assert!(second.contains("Content-Type: text/plain\r\n\r\n\r\n--"));
        assert!(!second.contains("payload"));
    }

    #[tokio::test]
    async fn test_factory_error_fails_the_read() {
        let payload = Payload::new().file(
            "document",
            InputFile::factory("missing.bin", || async {
                Err::<std::io::Cursor<Vec<u8>>, _>(io::Error::new(
                    io::ErrorKind::NotFound,
                    "gone",
                ))
            }),
        );

        let encoded = encode(&payload).unwrap();
        let err = encoded.body.collect().await.unwrap_err();
        assert_eq!(err.name, "missing.bin");
        assert_eq!(err.source.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_multipart_requires_runtime() {
        let payload = Payload::new().file("document", InputFile::memory("a.txt", "x"));
        assert!(encode(&payload).is_err());
    }
}
