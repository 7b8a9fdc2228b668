use std::fmt;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;
use serde::Deserialize;

/// Chunked byte source consumed by [`upload_stream`]. `Sync` is required
/// because the storage client hands the stream to its HTTP request body.
///
/// [`upload_stream`]: crate::provider::UploadProvider::upload_stream
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send + Sync + 'static>>;

/// A media asset the host wants stored.
///
/// Created by the host before an upload; the adapter fills in [`url`] after
/// a successful write and reads it back for `delete` and `signed_url`. The
/// descriptor is not owned by this crate beyond the call.
///
/// [`url`]: FileDescriptor::url
#[derive(Default)]
pub struct FileDescriptor {
    /// Content hash, used as the object-name stem.
    pub hash: String,
    /// File extension including the leading dot, e.g. `.png`.
    pub ext: String,
    /// Declared mime type.
    pub mime: String,
    /// Display name, used for the content-disposition header.
    pub name: String,
    /// Logical folder within the bucket.
    pub path: Option<String>,
    /// Entities this asset is attached to. The first reference doubles as
    /// the key-folder fallback when `path` is unset.
    pub related: Vec<RelatedRef>,
    /// In-memory payload for buffered uploads.
    pub buffer: Option<Bytes>,
    /// Byte stream for streamed uploads. Taken (consumed) by the adapter.
    pub stream: Option<ByteStream>,
    /// Public url, set after a successful upload.
    pub url: Option<String>,
}

impl fmt::Debug for FileDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileDescriptor")
            .field("hash", &self.hash)
            .field("ext", &self.ext)
            .field("mime", &self.mime)
            .field("name", &self.name)
            .field("path", &self.path)
            .field("related", &self.related)
            .field("buffer", &self.buffer.as_ref().map(Bytes::len))
            .field("stream", &self.stream.is_some())
            .field("url", &self.url)
            .finish()
    }
}

/// Reference to a host entity an asset belongs to.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelatedRef {
    #[serde(rename = "ref")]
    pub entity: Option<String>,
}
