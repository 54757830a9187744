//! Streamed `multipart/form-data` framing.
//!
//! Parts are laid out synchronously, then a producer task writes the framed
//! bytes into a bounded channel that the HTTP layer drains as the request
//! body. A failure while reading an upload is forwarded as an `Err` item so
//! the consumer never mistakes a truncated body for a complete one.

use super::input_file::{InputFile, ReaderFactory, UploadReader};
use bytes::Bytes;
use futures::channel::mpsc;
use futures::SinkExt;
use futures::StreamExt;
use std::error::Error as StdError;
use std::io;
use thiserror::Error;
use tokio_util::io::ReaderStream;
use tracing::{trace, warn};

/// Body stream handed to the HTTP layer
pub type BodyStream = mpsc::Receiver<Result<Bytes, UploadError>>;

/// An upload source failed to open or read while the body was streaming
///
/// This is a local failure: the HTTP layer surfaces it as
/// [`RequestError::UploadSource`](crate::errors::RequestError::UploadSource),
/// never as a network error.
#[derive(Error, Debug)]
#[error("upload '{name}' failed: {source}")]
pub struct UploadError {
    /// File name of the failed upload
    pub name: String,
    /// Underlying I/O error
    #[source]
    pub source: io::Error,
}

impl UploadError {
    /// Find an upload failure anywhere in an error's source chain
    pub fn find<'a>(error: &'a (dyn StdError + 'static)) -> Option<&'a UploadError> {
        let mut current = Some(error);
        while let Some(error) = current {
            if let Some(upload) = error.downcast_ref::<UploadError>() {
                return Some(upload);
            }
            current = error.source();
        }
        None
    }
}

/// Chunks buffered between the producer task and the HTTP layer
const CHANNEL_CAPACITY: usize = 8;

/// Read buffer size for upload readers
const READ_CHUNK: usize = 64 * 1024;

/// Content source of a file part
pub(crate) enum PartSource {
    Bytes(Bytes),
    Reader(UploadReader),
    Factory(ReaderFactory),
    Empty,
}

/// One multipart part
pub(crate) enum Part {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        content_type: String,
        source: PartSource,
    },
}

impl Part {
    pub(crate) fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Text {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Build a file part, consuming a single-use reader if there is one
    pub(crate) fn file(name: impl Into<String>, file: &InputFile) -> Self {
        let name = name.into();
        let file_name = file.file_name().unwrap_or(name.as_str()).to_string();
        let content_type = file.content_type();
        let source = match file {
            InputFile::Memory { data, .. } => PartSource::Bytes(data.clone()),
            InputFile::Factory { open, .. } => PartSource::Factory(open.clone()),
            InputFile::Reader { reader, .. } => match reader.lock().take() {
                Some(reader) => PartSource::Reader(reader),
                None => {
                    warn!(
                        part = %name,
                        file_name = %file_name,
                        "Single-use upload already consumed, sending empty part"
                    );
                    PartSource::Empty
                }
            },
            InputFile::FileId(_) | InputFile::Url(_) => PartSource::Empty,
        };
        Self::File {
            name,
            file_name,
            content_type,
            source,
        }
    }
}

/// A laid-out multipart body, ready to stream
pub(crate) struct Multipart {
    boundary: String,
    parts: Vec<Part>,
}

impl Multipart {
    pub(crate) fn new() -> Self {
        Self {
            boundary: uuid::Uuid::new_v4().simple().to_string(),
            parts: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, part: Part) {
        self.parts.push(part);
    }

    pub(crate) fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Spawn the producer on `handle` and return the consuming end
    pub(crate) fn stream(self, handle: &tokio::runtime::Handle) -> BodyStream {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        handle.spawn(produce(self, tx));
        rx
    }
}

type Sender = mpsc::Sender<Result<Bytes, UploadError>>;

async fn produce(multipart: Multipart, mut tx: Sender) {
    let Multipart { boundary, parts } = multipart;

    for part in parts {
        let outcome = match part {
            Part::Text { name, value } => {
                let mut chunk = part_header(&boundary, &name, None);
                chunk.push_str(&value);
                chunk.push_str("\r\n");
                send(&mut tx, Bytes::from(chunk)).await
            }
            Part::File {
                name,
                file_name,
                content_type,
                source,
            } => {
                let header = part_header(&boundary, &name, Some((&file_name, &content_type)));
                match send(&mut tx, Bytes::from(header)).await {
                    Ok(()) => write_source(&mut tx, source, &file_name).await,
                    Err(closed) => Err(closed),
                }
            }
        };

        match outcome {
            Ok(()) => {}
            Err(Closed::Receiver) => {
                trace!("Multipart consumer dropped, stopping producer");
                return;
            }
            Err(Closed::Failed(error)) => {
                warn!(error = %error, "Upload source failed while streaming");
                let _ = tx.send(Err(error)).await;
                return;
            }
        }
    }

    let _ = send(&mut tx, Bytes::from(format!("--{}--\r\n", boundary))).await;
}

enum Closed {
    Receiver,
    Failed(UploadError),
}

async fn send(tx: &mut Sender, chunk: Bytes) -> Result<(), Closed> {
    tx.send(Ok(chunk)).await.map_err(|_| Closed::Receiver)
}

fn failed(file_name: &str) -> impl FnOnce(io::Error) -> Closed + '_ {
    move |source| {
        Closed::Failed(UploadError {
            name: file_name.to_string(),
            source,
        })
    }
}

async fn write_source(tx: &mut Sender, source: PartSource, file_name: &str) -> Result<(), Closed> {
    match source {
        PartSource::Bytes(bytes) => {
            if !bytes.is_empty() {
                send(tx, bytes).await?;
            }
        }
        PartSource::Reader(reader) => copy(tx, reader, file_name).await?,
        PartSource::Factory(open) => {
            let reader = open().await.map_err(failed(file_name))?;
            copy(tx, reader, file_name).await?;
        }
        PartSource::Empty => {}
    }
    send(tx, Bytes::from_static(b"\r\n")).await
}

async fn copy(tx: &mut Sender, reader: UploadReader, file_name: &str) -> Result<(), Closed> {
    let mut chunks = ReaderStream::with_capacity(reader, READ_CHUNK);
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(failed(file_name))?;
        send(tx, chunk).await?;
    }
    Ok(())
}

fn part_header(boundary: &str, name: &str, file: Option<(&str, &str)>) -> String {
    let mut header = format!(
        "--{}\r\nContent-Disposition: form-data; name=\"{}\"",
        boundary,
        escape(name)
    );
    if let Some((file_name, content_type)) = file {
        header.push_str(&format!(
            "; filename=\"{}\"\r\nContent-Type: {}",
            escape(file_name),
            content_type
        ));
    }
    header.push_str("\r\n\r\n");
    header
}

fn escape(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn drain(rx: BodyStream) -> Result<String, UploadError> {
        let chunks: Vec<Result<Bytes, UploadError>> = rx.collect().await;
        let mut out = Vec::new();
        for chunk in chunks {
            out.extend_from_slice(&chunk?);
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    #[tokio::test]
    async fn test_framing() {
        let mut multipart = Multipart::new();
        let boundary = multipart.boundary.clone();
        multipart.push(Part::text("chat_id", "42"));
        multipart.push(Part::file("document", &InputFile::memory("a.txt", "hello")));

        let body = drain(multipart.stream(&tokio::runtime::Handle::current()))
            .await
            .unwrap();

        let expected = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"chat_id\"\r\n\r\n42\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"document\"; filename=\"a.txt\"\r\n\
             Content-Type: text/plain\r\n\r\nhello\r\n--{b}--\r\n",
            b = boundary
        );
        assert_eq!(body, expected);
    }

    #[test]
    fn test_escapes_quotes() {
        assert_eq!(escape("a\"b\r\nc"), "a%22b%0D%0Ac");
    }
}
