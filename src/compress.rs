//! Client-side gzip for the upload compression hint.
//!
//! The wrapped storage service transcodes gzip-encoded objects on download,
//! so compression here only changes what is stored, not what readers see.

use std::io::Write;

use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use futures_util::stream::{self, StreamExt};

use crate::file::ByteStream;

/// Resolution of the `gzip` configuration option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GzipMode {
    /// Compress exactly when the content type negotiates for it.
    Auto,
    /// Always compress.
    Enabled,
    /// Never compress.
    Disabled,
}

impl GzipMode {
    pub fn from_option(value: Option<bool>) -> Self {
        match value {
            None => GzipMode::Auto,
            Some(true) => GzipMode::Enabled,
            Some(false) => GzipMode::Disabled,
        }
    }

    pub fn should_compress(self, content_type: &str) -> bool {
        match self {
            GzipMode::Enabled => true,
            GzipMode::Disabled => false,
            GzipMode::Auto => negotiates_compression(content_type),
        }
    }
}

/// Whether a content type is worth compressing. Media formats carry their
/// own compression and are left alone.
pub fn negotiates_compression(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.starts_with("text/")
        || essence.ends_with("+json")
        || essence.ends_with("+xml")
        || matches!(
            essence.as_str(),
            "application/json"
                | "application/javascript"
                | "application/xml"
                | "application/x-javascript"
                | "image/svg+xml"
        )
}

/// Gzip-encode an in-memory payload.
pub fn gzip_bytes(data: &[u8]) -> std::io::Result<Bytes> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    Ok(Bytes::from(encoder.finish()?))
}

/// Gzip-encode a byte stream without buffering it whole.
///
/// Source chunks are fed through the encoder as they arrive; the trailer is
/// emitted after the source ends. A source error ends the stream with that
/// error and nothing further is emitted.
pub fn gzip_stream(source: ByteStream) -> ByteStream {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let seed = (source, Some(encoder));

    Box::pin(stream::try_unfold(
        seed,
        |(mut source, mut slot)| async move {
            let Some(mut encoder) = slot.take() else {
                return Ok(None);
            };
            loop {
                match source.next().await {
                    Some(Ok(chunk)) => {
                        encoder.write_all(&chunk)?;
                        let pending = std::mem::take(encoder.get_mut());
                        if !pending.is_empty() {
                            return Ok(Some((Bytes::from(pending), (source, Some(encoder)))));
                        }
                    }
                    Some(Err(err)) => return Err(err),
                    None => {
                        let tail = encoder.finish()?;
                        return Ok(Some((Bytes::from(tail), (source, None))));
                    }
                }
            }
        },
    ))
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use flate2::read::GzDecoder;
    use futures_util::TryStreamExt;

    use super::*;

    fn gunzip(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        GzDecoder::new(data).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn negotiation_covers_textual_types() {
        assert!(negotiates_compression("text/html"));
        assert!(negotiates_compression("text/plain; charset=utf-8"));
        assert!(negotiates_compression("application/json"));
        assert!(negotiates_compression("application/ld+json"));
        assert!(negotiates_compression("image/svg+xml"));
        assert!(!negotiates_compression("image/png"));
        assert!(!negotiates_compression("video/mp4"));
        assert!(!negotiates_compression("application/zip"));
    }

    #[test]
    fn mode_resolution() {
        assert!(GzipMode::Enabled.should_compress("image/png"));
        assert!(!GzipMode::Disabled.should_compress("text/html"));
        assert!(GzipMode::Auto.should_compress("text/html"));
        assert!(!GzipMode::Auto.should_compress("image/png"));
    }

    #[test]
    fn bytes_round_trip() {
        let payload = b"the quick brown fox jumps over the lazy dog".repeat(50);
        let compressed = gzip_bytes(&payload).unwrap();
        assert!(compressed.len() < payload.len());
        assert_eq!(gunzip(&compressed), payload);
    }

    #[test]
    fn stream_round_trip() {
        let chunks: Vec<std::io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"streamed ")),
            Ok(Bytes::from_static(b"world")),
        ];
        let source: ByteStream = Box::pin(stream::iter(chunks));

        let compressed: Vec<Bytes> =
            tokio_test::block_on(gzip_stream(source).try_collect()).unwrap();
        let compressed: Vec<u8> = compressed.concat();
        assert_eq!(gunzip(&compressed), b"hello streamed world");
    }

    #[test]
    fn empty_stream_emits_a_valid_archive() {
        let source: ByteStream = Box::pin(stream::iter(Vec::<std::io::Result<Bytes>>::new()));
        let compressed: Vec<Bytes> =
            tokio_test::block_on(gzip_stream(source).try_collect()).unwrap();
        assert_eq!(gunzip(&compressed.concat()), b"");
    }

    #[test]
    fn stream_errors_propagate() {
        let chunks: Vec<std::io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "boom")),
        ];
        let source: ByteStream = Box::pin(stream::iter(chunks));

        let result: Result<Vec<Bytes>, _> =
            tokio_test::block_on(gzip_stream(source).try_collect());
        assert_eq!(result.unwrap_err().kind(), std::io::ErrorKind::BrokenPipe);
    }
}
