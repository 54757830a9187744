//! File sources accepted by upload methods.

use bytes::Bytes;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncRead;

/// Byte source for one upload part
pub type UploadReader = Box<dyn AsyncRead + Send + Unpin>;

/// Re-openable upload source, invoked once per attempt
pub type ReaderFactory = Arc<dyn Fn() -> BoxFuture<'static, io::Result<UploadReader>> + Send + Sync>;

/// A file to send with a request
///
/// `FileId` and `Url` reference content the server already has or can fetch;
/// the remaining variants carry content and force a multipart request.
#[derive(Clone)]
pub enum InputFile {
    /// A file already stored on the server
    FileId(String),
    /// An HTTP URL the server downloads itself
    Url(String),
    /// Owned bytes
    Memory {
        /// File name sent in the part header
        name: String,
        /// File content
        data: Bytes,
    },
    /// A single-use reader. Only the first encoded attempt carries its bytes.
    Reader {
        /// File name sent in the part header
        name: String,
        /// The reader, taken on first use
        reader: Arc<Mutex<Option<UploadReader>>>,
    },
    /// A factory opened fresh for every attempt
    Factory {
        /// File name sent in the part header
        name: String,
        /// Opens a new reader over the content
        open: ReaderFactory,
    },
}

impl InputFile {
    /// Reference a file by its server-side identifier
    pub fn file_id(id: impl Into<String>) -> Self {
        Self::FileId(id.into())
    }

    /// Reference a file by URL
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }

    /// Upload owned bytes
    pub fn memory(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self::Memory {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Upload from a reader that can only be consumed once
    ///
    /// A retried request sends an empty part for this file. Prefer
    /// [`InputFile::factory`] or [`InputFile::path`] when retries are enabled.
    pub fn reader<R>(name: impl Into<String>, reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self::Reader {
            name: name.into(),
            reader: Arc::new(Mutex::new(Some(Box::new(reader)))),
        }
    }

    /// Upload from a factory producing a fresh reader on every attempt
    pub fn factory<F, Fut, R>(name: impl Into<String>, open: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = io::Result<R>> + Send + 'static,
        R: AsyncRead + Send + Unpin + 'static,
    {
        let open: ReaderFactory = Arc::new(move || {
            let fut = open();
            Box::pin(async move { fut.await.map(|r| Box::new(r) as UploadReader) })
        });
        Self::Factory {
            name: name.into(),
            open,
        }
    }

    /// Upload a file from disk, reopened on every attempt
    pub fn path(path: impl AsRef<Path>) -> Self {
        let path: PathBuf = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        Self::factory(name, move || tokio::fs::File::open(path.clone()))
    }

    /// Whether this file carries content that must be uploaded
    pub fn is_upload(&self) -> bool {
        !matches!(self, Self::FileId(_) | Self::Url(_))
    }

    /// The server-side reference for non-upload files
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::FileId(s) | Self::Url(s) => Some(s),
            _ => None,
        }
    }

    /// The file name used in the part header
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::Memory { name, .. } | Self::Reader { name, .. } | Self::Factory { name, .. } => {
                Some(name)
            }
            _ => None,
        }
    }

    /// Content type guessed from the file name
    pub fn content_type(&self) -> String {
        self.file_name()
            .and_then(|name| mime_guess::from_path(name).first())
            .unwrap_or(mime::APPLICATION_OCTET_STREAM)
            .to_string()
    }
}

impl fmt::Debug for InputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileId(id) => f.debug_tuple("FileId").field(id).finish(),
            Self::Url(url) => f.debug_tuple("Url").field(url).finish(),
            Self::Memory { name, data } => f
                .debug_struct("Memory")
                .field("name", name)
                .field("len", &data.len())
                .finish(),
            Self::Reader { name, reader } => f
                .debug_struct("Reader")
                .field("name", name)
                .field("consumed", &reader.lock().is_none())
                .finish(),
            Self::Factory { name, .. } => f.debug_struct("Factory").field("name", name).finish(),
        }
    }
}

impl From<&str> for InputFile {
    /// Strings starting with `http://` or `https://` are URLs, anything else a file id
    fn from(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            Self::url(value)
        } else {
            Self::file_id(value)
        }
    }
}
